//! # Shortlist Common Library
//!
//! Shared code for the shortlist crates:
//! - Error and result types
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Catalog token resolution
//! - Tracing initialisation
//! - Scan progress and state types

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{ScanProgress, ScanState};
