//! Reference profile builder
//!
//! Scans the examples directory (non-recursive, sorted by file name), runs
//! the feature extractor on every supported audio file and averages the
//! results. Files that fail extraction are logged and left out.

use crate::models::{FeatureVector, ReferenceProfile};
use crate::services::feature_extractor::{FeatureExtractor, SUPPORTED_EXTENSIONS};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Profile builder errors
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Examples path missing, unreadable, or not a directory
    #[error("Examples directory unusable {0}: {1}")]
    ExamplesDir(PathBuf, String),

    /// No example produced a valid feature vector
    #[error("No valid example tracks in {0}")]
    NoValidExamples(PathBuf),
}

/// True when the file name carries a supported audio extension (any case)
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Supported audio files directly inside `dir`, sorted by file name
pub fn list_examples(dir: &Path) -> Result<Vec<PathBuf>, ProfileError> {
    if !dir.exists() {
        return Err(ProfileError::ExamplesDir(dir.to_path_buf(), "path not found".to_string()));
    }
    if !dir.is_dir() {
        return Err(ProfileError::ExamplesDir(dir.to_path_buf(), "not a directory".to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ProfileError::ExamplesDir(dir.to_path_buf(), e.to_string()))?;
        if entry.file_type().is_file() && is_supported_audio(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Build the reference profile from the examples in `dir`
///
/// Blocking: runs the extractor on the calling thread.
pub fn build_profile(
    dir: &Path,
    extractor: &dyn FeatureExtractor,
) -> Result<ReferenceProfile, ProfileError> {
    let files = list_examples(dir)?;

    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        extractor = extractor.name(),
        "Building reference profile"
    );

    let mut features: Vec<FeatureVector> = Vec::with_capacity(files.len());
    for file in &files {
        match extractor.extract(file) {
            Ok(vector) => features.push(vector),
            Err(e) => {
                tracing::warn!(
                    file = %file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    error = %e,
                    "Skipping example track"
                );
            }
        }
    }

    let profile = ReferenceProfile::from_features(&features)
        .ok_or_else(|| ProfileError::NoValidExamples(dir.to_path_buf()))?;

    tracing::info!(
        examples = profile.count(),
        skipped = files.len() - profile.count(),
        bpm = format!("{:.1}", profile.bpm()),
        key = %profile.key(),
        "Reference profile ready"
    );

    Ok(profile)
}
