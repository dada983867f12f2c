//! Scan progress and state types
//!
//! Shared between the engine, which emits them, and whatever surface
//! observes a scan (CLI logging, a UI, a report file).

use serde::{Deserialize, Serialize};

/// Shortlist scan state
///
/// `Scanning → Filtering → Fetching → Extracting → Scoring → Committing|Discarding`
/// repeats per track; a scan ends in `Done` or `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanState {
    /// Fetching page metadata
    Scanning,
    /// Applying genre/year/completeness filters to one track
    Filtering,
    /// Downloading the track payload
    Fetching,
    /// Computing the feature vector
    Extracting,
    /// Comparing against the reference profile
    Scoring,
    /// Moving an accepted payload into the output tree
    Committing,
    /// Deleting a rejected payload
    Discarding,
    /// Every page in range processed
    Done,
    /// Cancelled by the caller
    Stopped,
}

impl ScanState {
    /// Terminal states end a scan
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Done | ScanState::Stopped)
    }
}

/// Progress report emitted at the start of every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Page about to be scanned
    pub current_page: u32,
    /// Number of pages in the requested range
    pub total_pages: u32,
    /// Entries committed so far
    pub kept_count: usize,
}

impl ScanProgress {
    /// One-based position of `current_page` within the range
    pub fn position(&self, start_page: u32) -> u32 {
        self.current_page.saturating_sub(start_page) + 1
    }

    /// Percentage of pages started (0.0 - 100.0)
    pub fn percentage(&self, start_page: u32) -> f64 {
        if self.total_pages == 0 {
            return 100.0;
        }
        (self.position(start_page) as f64 / self.total_pages as f64 * 100.0).min(100.0)
    }
}
