//! Service modules for the shortlist pipeline
//!
//! Leaves first: feature extraction, profile building, catalog access,
//! content fetching, scoring, and the controller that ties them together.

pub mod catalog_client;
pub mod content_fetcher;
pub mod feature_extractor;
pub mod profile_builder;
pub mod shortlist_controller;
pub mod similarity_scorer;

pub use catalog_client::{CatalogClient, CatalogError, CatalogSource};
pub use content_fetcher::{AudioSource, ContentFetcher, FetchError, FetchedAudio};
pub use feature_extractor::{
    ExtractionError, FeatureExtractor, SpectralFeatureExtractor, SUPPORTED_EXTENSIONS,
};
pub use profile_builder::{build_profile, list_examples, ProfileError};
pub use shortlist_controller::{CancelCheck, ProgressSink, ShortlistController};
pub use similarity_scorer::{similarity_score, GenreWeights, DEFAULT_WEIGHTS, GENRE_WEIGHTS};
