//! Scan request and result records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shortlist_common::{Error, ScanState};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use uuid::Uuid;

/// Year selection sentinel that disables the year filter
pub const OLDER_YEARS: &str = "Older";

/// Genre used for layout and reporting when a track lists none
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Parameters of one shortlist scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Accepted genres; empty means every genre
    pub genres: BTreeSet<String>,
    /// Accepted release years, may contain `"Older"`; empty means every year
    pub years: BTreeSet<String>,
    /// Minimum similarity score to keep a track (0.0-1.0)
    pub threshold: f64,
    /// First catalog page, inclusive
    pub start_page: u32,
    /// Last catalog page, inclusive
    pub end_page: u32,
}

impl ScanRequest {
    /// Checks performed by the caller before a scan is started
    ///
    /// The controller itself accepts any request; an inverted range simply
    /// scans nothing.
    pub fn validate(&self) -> Result<(), Error> {
        if self.genres.is_empty() {
            return Err(Error::InvalidInput("Select at least one genre".to_string()));
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidInput(format!(
                "Threshold must be within 0.0-1.0, got {}",
                self.threshold
            )));
        }
        if self.start_page == 0 {
            return Err(Error::InvalidInput("Pages start at 1".to_string()));
        }
        if self.start_page > self.end_page {
            return Err(Error::InvalidInput(format!(
                "Start page {} is after end page {}",
                self.start_page, self.end_page
            )));
        }
        Ok(())
    }

    /// Pages to scan, in increasing order
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    /// Number of pages in range (0 for an inverted range)
    pub fn total_pages(&self) -> u32 {
        if self.end_page < self.start_page {
            0
        } else {
            self.end_page - self.start_page + 1
        }
    }

    /// Genre filter: passes when no genre was requested or the track's genre
    /// is one of them
    pub fn genre_allowed(&self, genre: Option<&str>) -> bool {
        if self.genres.is_empty() {
            return true;
        }
        genre.is_some_and(|g| self.genres.contains(g))
    }

    /// Year filter: passes when no year was requested, `"Older"` was
    /// requested, the track has no release year, or its year was requested
    pub fn year_allowed(&self, year: Option<&str>) -> bool {
        if self.years.is_empty() || self.years.contains(OLDER_YEARS) {
            return true;
        }
        match year {
            Some(year) => self.years.contains(year),
            None => true,
        }
    }
}

/// One accepted track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    /// Joined artist names, possibly empty
    pub artist: String,
    pub title: String,
    pub genre: String,
    /// Similarity score rounded to 3 decimals
    pub score: f64,
    /// Where the payload was committed
    pub path: PathBuf,
}

/// Round a score to 3 decimals for reporting
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Per-scan counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub pages_scanned: usize,
    pub pages_failed: usize,
    pub tracks_seen: usize,
    pub filtered_genre: usize,
    pub filtered_year: usize,
    /// Missing title or stream URL
    pub incomplete: usize,
    pub fetch_failures: usize,
    pub extraction_failures: usize,
    /// Scored below threshold
    pub rejected: usize,
    pub commit_failures: usize,
}

/// Outcome of a scan
///
/// `tracks` is in acceptance order: page order, then listing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub state: ScanState,
    pub kept: usize,
    pub tracks: Vec<ShortlistEntry>,
    pub stats: ScanStatistics,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    /// Empty result for a scan that is about to start
    pub fn new(scan_id: Uuid) -> Self {
        Self {
            scan_id,
            state: ScanState::Scanning,
            kept: 0,
            tracks: Vec::new(),
            stats: ScanStatistics::default(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record an accepted entry whose file is already in place
    pub fn push(&mut self, entry: ShortlistEntry) {
        self.tracks.push(entry);
        self.kept = self.tracks.len();
    }

    /// Close the result in a terminal state
    pub fn finish(mut self, state: ScanState) -> Self {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.finished_at = Some(Utc::now());
        self
    }
}
