//! shortlist-engine library interface
//!
//! Builds a reference profile from example tracks, scans a remote catalog
//! page range, and commits tracks that sound alike into a genre-organized
//! output directory.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{EngineError, EngineResult};

use crate::models::ReferenceProfile;
use crate::services::{build_profile, FeatureExtractor};
use std::path::Path;
use std::sync::Arc;

/// Build the reference profile on a blocking worker thread
pub async fn build_reference_profile(
    examples_dir: &Path,
    extractor: Arc<dyn FeatureExtractor>,
) -> EngineResult<ReferenceProfile> {
    let dir = examples_dir.to_path_buf();
    let profile = tokio::task::spawn_blocking(move || build_profile(&dir, extractor.as_ref()))
        .await
        .map_err(|e| {
            shortlist_common::Error::Internal(format!("Profile task failed: {e}"))
        })??;
    Ok(profile)
}
