//! Genre-weighted similarity between the reference profile and a candidate
//!
//! Each dimension yields a sub-score in [0, 1]; the final score is their
//! weighted sum using the candidate genre's row of [`GENRE_WEIGHTS`], or
//! [`DEFAULT_WEIGHTS`] for unlisted genres.

use crate::models::{FeatureVector, ReferenceProfile};
use serde::Serialize;

/// Added to the reference bass level before dividing
pub const BASS_EPSILON: f64 = 1e-6;

/// BPM difference at which the tempo sub-score reaches zero
const BPM_TOLERANCE: f64 = 30.0;
const RHYTHM_TOLERANCE: f64 = 1.2;
/// Centroid difference (Hz) at which the brightness sub-score reaches zero
const BRIGHTNESS_TOLERANCE: f64 = 2500.0;

/// Per-dimension weights; each row sums to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenreWeights {
    pub bpm: f64,
    pub rhythm: f64,
    pub bass: f64,
    pub brightness: f64,
    pub key: f64,
}

impl GenreWeights {
    const fn new(bpm: f64, rhythm: f64, bass: f64, brightness: f64, key: f64) -> Self {
        Self {
            bpm,
            rhythm,
            bass,
            brightness,
            key,
        }
    }

    pub fn total(&self) -> f64 {
        self.bpm + self.rhythm + self.bass + self.brightness + self.key
    }
}

/// Weights for genres without their own row
pub const DEFAULT_WEIGHTS: GenreWeights = GenreWeights::new(0.25, 0.30, 0.20, 0.15, 0.10);

/// Genre-specific weights, matched on the exact genre name
pub const GENRE_WEIGHTS: &[(&str, GenreWeights)] = &[
    ("Afro House", GenreWeights::new(0.20, 0.35, 0.25, 0.10, 0.10)),
    ("Progressive House", GenreWeights::new(0.20, 0.20, 0.10, 0.30, 0.20)),
    ("Melodic House", GenreWeights::new(0.20, 0.20, 0.10, 0.30, 0.20)),
    ("Tech House", GenreWeights::new(0.30, 0.35, 0.20, 0.05, 0.10)),
    ("Drum & Bass", GenreWeights::new(0.40, 0.30, 0.20, 0.05, 0.05)),
    ("Techno", GenreWeights::new(0.30, 0.40, 0.20, 0.05, 0.05)),
];

/// Weight row for a genre (`None` or unlisted → default)
pub fn weights_for(genre: Option<&str>) -> GenreWeights {
    genre
        .and_then(|g| GENRE_WEIGHTS.iter().find(|(name, _)| *name == g))
        .map(|(_, weights)| *weights)
        .unwrap_or(DEFAULT_WEIGHTS)
}

/// Per-dimension sub-scores of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub bpm: f64,
    pub rhythm: f64,
    pub bass: f64,
    pub brightness: f64,
    pub key: f64,
}

impl SubScores {
    pub fn compare(reference: &ReferenceProfile, candidate: &FeatureVector) -> Self {
        Self {
            bpm: closeness(reference.bpm(), candidate.bpm(), BPM_TOLERANCE),
            rhythm: closeness(reference.rhythm(), candidate.rhythm(), RHYTHM_TOLERANCE),
            bass: closeness(reference.bass(), candidate.bass(), reference.bass() + BASS_EPSILON),
            brightness: closeness(
                reference.brightness(),
                candidate.brightness(),
                BRIGHTNESS_TOLERANCE,
            ),
            key: if reference.key() == candidate.key() { 1.0 } else { 0.0 },
        }
    }

    pub fn weighted(&self, weights: &GenreWeights) -> f64 {
        let sum = weights.bpm * self.bpm
            + weights.rhythm * self.rhythm
            + weights.bass * self.bass
            + weights.brightness * self.brightness
            + weights.key * self.key;
        sum.clamp(0.0, 1.0)
    }
}

// max(0, 1 - |a - b| / tolerance), clamped to [0, 1]
fn closeness(reference: f64, candidate: f64, tolerance: f64) -> f64 {
    (1.0 - (reference - candidate).abs() / tolerance).clamp(0.0, 1.0)
}

/// Similarity of `candidate` to `reference` for a track of `genre`, in [0, 1]
pub fn similarity_score(
    reference: &ReferenceProfile,
    candidate: &FeatureVector,
    genre: Option<&str>,
) -> f64 {
    SubScores::compare(reference, candidate).weighted(&weights_for(genre))
}
