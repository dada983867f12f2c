//! Reference profile: centroid of the example tracks' feature vectors

use super::features::{FeatureVector, PitchClass};
use serde::Serialize;

/// Aggregated acoustic fingerprint of the user's example tracks
///
/// Invariant: `count >= 1`. The only constructor refuses an empty input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceProfile {
    bpm: f64,
    rhythm: f64,
    key: PitchClass,
    brightness: f64,
    bass: f64,
    count: usize,
}

impl ReferenceProfile {
    /// Aggregate feature vectors into a profile
    ///
    /// **Algorithm:**
    /// - `bpm`, `rhythm`, `brightness`, `bass`: arithmetic mean
    /// - `key`: most frequent key; ties go to the key seen first in `features`
    ///
    /// Returns `None` when `features` is empty.
    pub fn from_features(features: &[FeatureVector]) -> Option<Self> {
        if features.is_empty() {
            return None;
        }

        let n = features.len() as f64;
        let mean = |get: fn(&FeatureVector) -> f64| features.iter().map(get).sum::<f64>() / n;

        Some(Self {
            bpm: mean(FeatureVector::bpm),
            rhythm: mean(FeatureVector::rhythm),
            key: majority_key(features),
            brightness: mean(FeatureVector::brightness),
            bass: mean(FeatureVector::bass),
            count: features.len(),
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn rhythm(&self) -> f64 {
        self.rhythm
    }

    pub fn key(&self) -> PitchClass {
        self.key
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn bass(&self) -> f64 {
        self.bass
    }

    /// Number of examples that produced a valid feature vector
    pub fn count(&self) -> usize {
        self.count
    }
}

// Counts kept in first-seen order so a strict `>` comparison keeps the
// earliest key on ties.
fn majority_key(features: &[FeatureVector]) -> PitchClass {
    let mut counts: Vec<(PitchClass, usize)> = Vec::with_capacity(12);
    for feature in features {
        match counts.iter_mut().find(|(key, _)| *key == feature.key()) {
            Some((_, count)) => *count += 1,
            None => counts.push((feature.key(), 1)),
        }
    }

    let mut best = counts[0];
    for &(key, count) in &counts[1..] {
        if count > best.1 {
            best = (key, count);
        }
    }
    best.0
}
