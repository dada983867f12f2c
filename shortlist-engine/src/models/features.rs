//! Acoustic feature records
//!
//! A `FeatureVector` is validated on construction: every float must be
//! finite and inside its domain. A vector that fails validation is treated
//! as an extraction failure by callers, never patched with defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the 12 pitch classes of the chromatic scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    /// Chromatic order starting at C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for a chroma index (wraps modulo 12)
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Chroma index, C = 0
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised pitch class name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown pitch class: {0}")]
pub struct UnknownPitchClass(pub String);

impl FromStr for PitchClass {
    type Err = UnknownPitchClass;

    /// Accepts sharp names ("C#") and their flat enharmonics ("Db")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pitch = match s.trim() {
            "C" | "B#" => PitchClass::C,
            "C#" | "Db" => PitchClass::CSharp,
            "D" => PitchClass::D,
            "D#" | "Eb" => PitchClass::DSharp,
            "E" | "Fb" => PitchClass::E,
            "F" | "E#" => PitchClass::F,
            "F#" | "Gb" => PitchClass::FSharp,
            "G" => PitchClass::G,
            "G#" | "Ab" => PitchClass::GSharp,
            "A" => PitchClass::A,
            "A#" | "Bb" => PitchClass::ASharp,
            "B" | "Cb" => PitchClass::B,
            other => return Err(UnknownPitchClass(other.to_string())),
        };
        Ok(pitch)
    }
}

/// Feature value outside its domain
#[derive(Debug, Error, PartialEq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidFeature {
    pub field: &'static str,
    pub value: f64,
}

/// Five-dimensional acoustic descriptor of one audio file
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    bpm: f64,
    rhythm: f64,
    key: PitchClass,
    brightness: f64,
    bass: f64,
}

impl FeatureVector {
    /// Build a validated vector
    ///
    /// # Errors
    /// - `bpm` not finite or not > 0
    /// - `rhythm`, `brightness`, `bass` not finite or negative
    pub fn new(
        bpm: f64,
        rhythm: f64,
        key: PitchClass,
        brightness: f64,
        bass: f64,
    ) -> Result<Self, InvalidFeature> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(InvalidFeature {
                field: "bpm",
                value: bpm,
            });
        }
        for (field, value) in [("rhythm", rhythm), ("brightness", brightness), ("bass", bass)] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidFeature { field, value });
            }
        }

        Ok(Self {
            bpm,
            rhythm,
            key,
            brightness,
            bass,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Mean onset strength
    pub fn rhythm(&self) -> f64 {
        self.rhythm
    }

    pub fn key(&self) -> PitchClass {
        self.key
    }

    /// Mean spectral centroid in Hz
    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    /// Mean low-frequency (20-150 Hz) magnitude
    pub fn bass(&self) -> f64 {
        self.bass
    }
}
