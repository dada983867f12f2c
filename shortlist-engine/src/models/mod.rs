//! Data models for the shortlist engine

pub mod catalog;
pub mod features;
pub mod profile;
pub mod scan;

pub use catalog::{CatalogArtist, CatalogPage, CatalogTrack};
pub use features::{FeatureVector, InvalidFeature, PitchClass, UnknownPitchClass};
pub use profile::ReferenceProfile;
pub use scan::{
    round_score, ScanRequest, ScanResult, ScanStatistics, ShortlistEntry, OLDER_YEARS,
    UNKNOWN_GENRE,
};
