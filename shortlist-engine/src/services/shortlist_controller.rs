//! Shortlist controller
//!
//! Drives one scan over a page range:
//!
//! SCANNING(page) → FILTERING(track) → FETCHING → EXTRACTING → SCORING →
//! COMMITTING | DISCARDING → next track | next page → DONE | STOPPED
//!
//! Pages and tracks are processed strictly in order, one at a time.
//! Cancellation is polled at the top of every page and before every track;
//! an in-flight fetch or extraction always runs to completion. Every failure
//! below the page level skips one track and the scan goes on.

use crate::models::{
    round_score, CatalogTrack, FeatureVector, ReferenceProfile, ScanRequest, ScanResult,
    ShortlistEntry, UNKNOWN_GENRE,
};
use crate::services::catalog_client::CatalogSource;
use crate::services::content_fetcher::AudioSource;
use crate::services::feature_extractor::{ExtractionError, FeatureExtractor};
use crate::services::similarity_scorer::similarity_score;
use crate::utils::output_layout;
use shortlist_common::{ScanProgress, ScanState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Observer for per-page progress
pub type ProgressSink<'a> = &'a (dyn Fn(ScanProgress) + Send + Sync);

/// Cancellation predicate, polled between units of work
pub type CancelCheck<'a> = &'a (dyn Fn() -> bool + Send + Sync);

/// Runs shortlist scans against injected collaborators
pub struct ShortlistController {
    catalog: Arc<dyn CatalogSource>,
    fetcher: Arc<dyn AudioSource>,
    extractor: Arc<dyn FeatureExtractor>,
    output_dir: PathBuf,
}

impl ShortlistController {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        fetcher: Arc<dyn AudioSource>,
        extractor: Arc<dyn FeatureExtractor>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            extractor,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scan `request`'s page range against `profile`
    ///
    /// Always returns a result: `DONE` once every page was processed,
    /// `STOPPED` when `is_cancelled` returned true first. Every entry in the
    /// result has its file in place under the output directory.
    pub async fn run(
        &self,
        request: &ScanRequest,
        profile: &ReferenceProfile,
        progress: Option<ProgressSink<'_>>,
        is_cancelled: CancelCheck<'_>,
    ) -> ScanResult {
        let mut result = ScanResult::new(Uuid::new_v4());
        let scan_id = result.scan_id;
        let total_pages = request.total_pages();

        tracing::info!(
            scan_id = %scan_id,
            start_page = request.start_page,
            end_page = request.end_page,
            threshold = request.threshold,
            genres = ?request.genres,
            years = ?request.years,
            output = %self.output_dir.display(),
            "Starting shortlist scan"
        );

        for page in request.pages() {
            if is_cancelled() {
                return Self::stopped(result, page);
            }

            result.state = ScanState::Scanning;
            if let Some(sink) = progress {
                sink(ScanProgress {
                    current_page: page,
                    total_pages,
                    kept_count: result.kept,
                });
            }

            let tracks = match self.catalog.fetch_page(page).await {
                Ok(tracks) => {
                    result.stats.pages_scanned += 1;
                    tracks
                }
                Err(e) => {
                    result.stats.pages_failed += 1;
                    tracing::warn!(
                        scan_id = %scan_id,
                        page,
                        error = %e,
                        "Catalog page unavailable, continuing with next page"
                    );
                    Vec::new()
                }
            };

            tracing::debug!(scan_id = %scan_id, page, tracks = tracks.len(), "Processing page");

            for track in &tracks {
                if is_cancelled() {
                    return Self::stopped(result, page);
                }
                result.stats.tracks_seen += 1;
                self.process_track(&mut result, request, profile, track, page)
                    .await;
            }
        }

        let result = result.finish(ScanState::Done);
        tracing::info!(
            scan_id = %scan_id,
            kept = result.kept,
            tracks_seen = result.stats.tracks_seen,
            pages_failed = result.stats.pages_failed,
            "Shortlist scan complete"
        );
        result
    }

    fn stopped(result: ScanResult, page: u32) -> ScanResult {
        tracing::info!(
            scan_id = %result.scan_id,
            page,
            kept = result.kept,
            "Shortlist scan cancelled"
        );
        result.finish(ScanState::Stopped)
    }

    /// One track through filter → fetch → extract → score → commit/discard
    async fn process_track(
        &self,
        result: &mut ScanResult,
        request: &ScanRequest,
        profile: &ReferenceProfile,
        track: &CatalogTrack,
        page: u32,
    ) {
        let scan_id = result.scan_id;
        result.state = ScanState::Filtering;

        let genre = track.genre_name();
        if !request.genre_allowed(genre) {
            result.stats.filtered_genre += 1;
            tracing::trace!(scan_id = %scan_id, page, track = %track.identity(), genre = ?genre, "Genre filtered");
            return;
        }
        if !request.year_allowed(track.release_year()) {
            result.stats.filtered_year += 1;
            tracing::trace!(scan_id = %scan_id, page, track = %track.identity(), year = ?track.release_year(), "Year filtered");
            return;
        }
        let (Some(title), Some(url)) = (track.title_text(), track.stream_url_text()) else {
            result.stats.incomplete += 1;
            tracing::debug!(scan_id = %scan_id, page, track = %track.identity(), "Missing title or stream URL");
            return;
        };

        result.state = ScanState::Fetching;
        let Some(audio) = self.fetcher.fetch(url).await else {
            result.stats.fetch_failures += 1;
            tracing::warn!(scan_id = %scan_id, page, title, "Audio unavailable, skipping track");
            return;
        };

        result.state = ScanState::Extracting;
        let features = match self.extract(audio.path()).await {
            Ok(features) => features,
            Err(e) => {
                result.stats.extraction_failures += 1;
                tracing::warn!(scan_id = %scan_id, page, title, error = %e, "Feature extraction failed, skipping track");
                audio.discard();
                return;
            }
        };

        result.state = ScanState::Scoring;
        let score = similarity_score(profile, &features, genre);

        if score < request.threshold {
            result.state = ScanState::Discarding;
            result.stats.rejected += 1;
            tracing::debug!(scan_id = %scan_id, page, title, score = round_score(score), "Below threshold");
            audio.discard();
            return;
        }

        result.state = ScanState::Committing;
        let genre_label = genre.unwrap_or(UNKNOWN_GENRE);
        let artist = track.artist_display();
        let destination = output_layout::destination(
            &self.output_dir,
            genre_label,
            &artist,
            title,
            audio.extension(),
        );

        match output_layout::commit(audio.into_temp_path(), &destination) {
            Ok(()) => {
                let score = round_score(score);
                tracing::info!(
                    scan_id = %scan_id,
                    page,
                    title,
                    artist = %artist,
                    genre = genre_label,
                    score,
                    "Track shortlisted"
                );
                result.push(ShortlistEntry {
                    artist,
                    title: title.to_string(),
                    genre: genre_label.to_string(),
                    score,
                    path: destination,
                });
            }
            Err(e) => {
                result.stats.commit_failures += 1;
                tracing::warn!(scan_id = %scan_id, page, title, error = %e, "Commit failed, skipping track");
            }
        }
    }

    /// Run the extractor on a blocking worker thread
    async fn extract(&self, path: &Path) -> Result<FeatureVector, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| ExtractionError::Internal(format!("Extraction task failed: {e}")))?
    }
}
