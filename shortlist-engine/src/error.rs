//! Error types for shortlist-engine
//!
//! Each service owns its error enum. `EngineError` collects the ones that can
//! end a command before or outside the scan loop; per-track failures never
//! reach it.

use thiserror::Error;

pub use crate::services::catalog_client::CatalogError;
pub use crate::services::feature_extractor::ExtractionError;
pub use crate::services::profile_builder::ProfileError;
pub use crate::utils::output_layout::CommitError;

/// Command-level error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reference profile could not be built (fatal before scanning)
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Catalog request failed outside a scan
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Configuration or input validation
    #[error("{0}")]
    Common(#[from] shortlist_common::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type
pub type EngineResult<T> = Result<T, EngineError>;
