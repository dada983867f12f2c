//! Shortlist controller integration tests
//!
//! Runs the controller against in-memory catalog, audio and extractor fakes
//! and checks results, statistics and the on-disk output layout.

mod helpers;

use helpers::{track, FakeAudio, FakeCatalog, FixedExtractor};
use shortlist_common::{ScanProgress, ScanState};
use shortlist_engine::models::{FeatureVector, PitchClass, ReferenceProfile, ScanRequest};
use shortlist_engine::services::ShortlistController;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn matching() -> FeatureVector {
    FeatureVector::new(122.0, 1.0, PitchClass::A, 2000.0, 0.5).unwrap()
}

fn distant() -> FeatureVector {
    FeatureVector::new(175.0, 4.0, PitchClass::C, 8000.0, 3.0).unwrap()
}

fn reference() -> ReferenceProfile {
    ReferenceProfile::from_features(&[matching()]).unwrap()
}

fn request(genres: &[&str], years: &[&str], start_page: u32, end_page: u32) -> ScanRequest {
    ScanRequest {
        genres: genres.iter().map(|s| s.to_string()).collect(),
        years: years.iter().map(|s| s.to_string()).collect(),
        threshold: 0.7,
        start_page,
        end_page,
    }
}

struct Harness {
    output: TempDir,
    cache: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            output: tempfile::tempdir().unwrap(),
            cache: tempfile::tempdir().unwrap(),
        }
    }

    fn audio(&self) -> FakeAudio {
        FakeAudio::new(self.cache.path())
    }

    fn controller(
        &self,
        catalog: Arc<FakeCatalog>,
        audio: Arc<FakeAudio>,
        extractor: FixedExtractor,
    ) -> ShortlistController {
        ShortlistController::new(catalog, audio, Arc::new(extractor), self.output.path())
    }

    fn output_files(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(self.output.path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(self.output.path()).unwrap().to_path_buf())
            .collect()
    }

    fn cache_is_empty(&self) -> bool {
        std::fs::read_dir(self.cache.path()).unwrap().count() == 0
    }
}

fn never() -> bool {
    false
}

#[tokio::test]
async fn test_empty_page_yields_empty_result() {
    let harness = Harness::new();
    let catalog = Arc::new(FakeCatalog::new().with_page(1, Vec::new()));
    let controller = harness.controller(catalog, Arc::new(harness.audio()), FixedExtractor::new());

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.state, ScanState::Done);
    assert_eq!(result.kept, 0);
    assert!(result.tracks.is_empty());
    assert_eq!(result.stats.pages_scanned, 1);
    assert!(result.finished_at.is_some());
    assert!(harness.output_files().is_empty());
}

#[tokio::test]
async fn test_cancel_after_third_page_stops_scan() {
    let harness = Harness::new();
    let mut catalog = FakeCatalog::new();
    let mut extractor = FixedExtractor::new();
    for page in 1..=10 {
        let url = format!("https://cdn.test/p{page}.mp3");
        catalog = catalog.with_page(page, vec![track(&format!("Track {page}"), &["DJ"], Some("Techno"), None, &url)]);
        extractor = extractor.with(&url, matching());
    }
    let catalog = Arc::new(catalog);
    let audio = Arc::new(harness.audio());
    let controller = harness.controller(Arc::clone(&catalog), Arc::clone(&audio), extractor);

    let watched = Arc::clone(&audio);
    let cancel_after_three = move || watched.fetched().len() >= 3;

    let result = controller
        .run(&request(&["Techno"], &[], 1, 10), &reference(), None, &cancel_after_three)
        .await;

    assert_eq!(result.state, ScanState::Stopped);
    assert_eq!(result.kept, 3);
    assert_eq!(catalog.requested(), vec![1, 2, 3]);
    assert_eq!(audio.fetched().len(), 3);
    let titles: Vec<&str> = result.tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["Track 1", "Track 2", "Track 3"]);
    for entry in &result.tracks {
        assert!(entry.path.exists(), "{} missing", entry.path.display());
    }
    assert_eq!(harness.output_files().len(), 3);
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let harness = Harness::new();
    let catalog = Arc::new(FakeCatalog::new().with_page(1, Vec::new()));
    let controller = harness.controller(Arc::clone(&catalog), Arc::new(harness.audio()), FixedExtractor::new());

    let result = controller
        .run(&request(&["Techno"], &[], 1, 5), &reference(), None, &|| true)
        .await;

    assert_eq!(result.state, ScanState::Stopped);
    assert!(catalog.requested().is_empty());
}

#[tokio::test]
async fn test_year_filter_excludes_other_years() {
    let harness = Harness::new();
    let old_url = "https://cdn.test/2024.mp3";
    let new_url = "https://cdn.test/2025.mp3";
    let undated_url = "https://cdn.test/undated.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(
        1,
        vec![
            track("Last Year", &[], Some("Techno"), Some("2024-11-02"), old_url),
            track("This Year", &[], Some("Techno"), Some("2025-01-10"), new_url),
            track("Undated", &[], Some("Techno"), None, undated_url),
        ],
    ));
    let extractor = FixedExtractor::new()
        .with(old_url, matching())
        .with(new_url, matching())
        .with(undated_url, matching());
    let audio = Arc::new(harness.audio());
    let controller = harness.controller(catalog, Arc::clone(&audio), extractor);

    let result = controller
        .run(&request(&["Techno"], &["2025"], 1, 1), &reference(), None, &never)
        .await;

    let titles: Vec<&str> = result.tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["This Year", "Undated"]);
    assert_eq!(result.stats.filtered_year, 1);
    assert!(!audio.fetched().contains(&old_url.to_string()), "filtered track was fetched");
}

#[tokio::test]
async fn test_older_selection_accepts_every_year() {
    let harness = Harness::new();
    let url = "https://cdn.test/classic.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(
        1,
        vec![track("Classic", &[], Some("Techno"), Some("1996-05-01"), url)],
    ));
    let controller = harness.controller(catalog, Arc::new(harness.audio()), FixedExtractor::new().with(url, matching()));

    let result = controller
        .run(&request(&["Techno"], &["2025", "Older"], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.kept, 1);
}

#[tokio::test]
async fn test_genre_filter() {
    let harness = Harness::new();
    let urls = ["https://cdn.test/a.mp3", "https://cdn.test/b.mp3", "https://cdn.test/c.mp3"];
    let catalog = Arc::new(FakeCatalog::new().with_page(
        1,
        vec![
            track("Wanted", &[], Some("Techno"), None, urls[0]),
            track("Other", &[], Some("House"), None, urls[1]),
            track("Untagged", &[], None, None, urls[2]),
        ],
    ));
    let mut extractor = FixedExtractor::new();
    for url in urls {
        extractor = extractor.with(url, matching());
    }
    let controller = harness.controller(catalog, Arc::new(harness.audio()), extractor);

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.kept, 1);
    assert_eq!(result.tracks[0].title, "Wanted");
    assert_eq!(result.stats.filtered_genre, 2);
}

#[tokio::test]
async fn test_untagged_track_without_genre_filter_goes_to_unknown() {
    let harness = Harness::new();
    let url = "https://cdn.test/untagged.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![track("Mystery", &[], None, None, url)]));
    let controller = harness.controller(catalog, Arc::new(harness.audio()), FixedExtractor::new().with(url, matching()));

    let result = controller
        .run(&request(&[], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.tracks[0].genre, "Unknown");
    assert_eq!(harness.output_files(), vec![PathBuf::from("Unknown/Mystery.mp3")]);
}

#[tokio::test]
async fn test_incomplete_track_is_skipped_without_fetch() {
    let harness = Harness::new();
    let mut no_url = track("No Stream", &[], Some("Techno"), None, "unused");
    no_url.stream_url = None;
    let mut blank_title = track("   ", &[], Some("Techno"), None, "https://cdn.test/blank.mp3");
    blank_title.artists = None;

    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![no_url, blank_title]));
    let audio = Arc::new(harness.audio());
    let controller = harness.controller(catalog, Arc::clone(&audio), FixedExtractor::new());

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.stats.incomplete, 2);
    assert!(audio.fetched().is_empty());
}

#[tokio::test]
async fn test_unavailable_audio_is_skipped() {
    let harness = Harness::new();
    let url = "https://cdn.test/gone.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![track("Gone", &[], Some("Techno"), None, url)]));
    let audio = Arc::new(harness.audio().with_unavailable(url));
    let controller = harness.controller(catalog, audio, FixedExtractor::new().with(url, matching()));

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.state, ScanState::Done);
    assert_eq!(result.kept, 0);
    assert_eq!(result.stats.fetch_failures, 1);
    assert_eq!(std::fs::read_dir(harness.output.path()).unwrap().count(), 0);
    assert!(harness.cache_is_empty());
}

#[tokio::test]
async fn test_fetch_exhaustion_leaves_output_and_cache_empty() {
    use axum::{http::StatusCode, routing::get, Router};
    use shortlist_common::config::{CatalogConfig, FetchConfig};
    use shortlist_engine::services::ContentFetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/gone.mp3",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let harness = Harness::new();
    let url = format!("{base}/gone.mp3");
    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![track("Gone", &["DJ"], Some("Techno"), None, &url)]));
    let catalog_config = CatalogConfig {
        base_url: base.clone(),
        ..CatalogConfig::default()
    };
    let fetch_config = FetchConfig {
        max_attempts: 3,
        backoff_ms: 10,
        ..FetchConfig::default()
    };
    let fetcher = ContentFetcher::new(&catalog_config, None, fetch_config, harness.cache.path()).unwrap();
    let controller = ShortlistController::new(
        catalog,
        Arc::new(fetcher),
        Arc::new(FixedExtractor::new().with(&url, matching())),
        harness.output.path(),
    );

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.state, ScanState::Done);
    assert_eq!(result.kept, 0);
    assert_eq!(result.stats.fetch_failures, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(std::fs::read_dir(harness.output.path()).unwrap().count(), 0);
    assert!(harness.cache_is_empty());
}

#[tokio::test]
async fn test_extraction_failure_discards_payload() {
    let harness = Harness::new();
    let url = "https://cdn.test/corrupt.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![track("Corrupt", &[], Some("Techno"), None, url)]));
    let controller = harness.controller(catalog, Arc::new(harness.audio()), FixedExtractor::new());

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.stats.extraction_failures, 1);
    assert_eq!(result.kept, 0);
    assert!(harness.cache_is_empty());
    assert!(harness.output_files().is_empty());
}

#[tokio::test]
async fn test_below_threshold_is_discarded() {
    let harness = Harness::new();
    let url = "https://cdn.test/far.mp3";
    let catalog = Arc::new(FakeCatalog::new().with_page(1, vec![track("Far Away", &[], Some("Techno"), None, url)]));
    let controller = harness.controller(catalog, Arc::new(harness.audio()), FixedExtractor::new().with(url, distant()));

    let result = controller
        .run(&request(&["Techno"], &[], 1, 1), &reference(), None, &never)
        .await;

    assert_eq!(result.stats.rejected, 1);
    assert_eq!(result.kept, 0);
    assert!(harness.cache_is_empty());
}

#[tokio::test]
async fn test_commit_layout_and_order() {
    let harness = Harness::new();
    let urls = [
        "https://cdn.test/1.mp3",
        "https://cdn.test/2.mp3",
        "https://cdn.test/3.mp3",
    ];
    let catalog = Arc::new(
        FakeCatalog::new()
            .with_page(
                1,
                vec![
                    track("Sunrise", &["Ama", "Kofi"], Some("Afro House"), Some("2025-02-01"), urls[0]),
                    track("Solo", &[], Some("Afro House"), Some("2025-03-01"), urls[1]),
                ],
            )
            .with_page(2, vec![track("A/B", &["X"], Some("Tech House"), None, urls[2])]),
    );
    let mut extractor = FixedExtractor::new();
    for url in urls {
        extractor = extractor.with(url, matching());
    }
    let controller = harness.controller(catalog, Arc::new(harness.audio()), extractor);

    let result = controller
        .run(&request(&["Afro House", "Tech House"], &[], 1, 2), &reference(), None, &never)
        .await;

    assert_eq!(result.kept, 3);
    let relative: Vec<PathBuf> = result
        .tracks
        .iter()
        .map(|t| t.path.strip_prefix(harness.output.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        relative,
        vec![
            Path::new("Afro_House").join("Ama, Kofi - Sunrise.mp3"),
            Path::new("Afro_House").join("Solo.mp3"),
            Path::new("Tech_House").join("X - A_B.mp3"),
        ]
    );

    let first = &result.tracks[0];
    assert_eq!(first.artist, "Ama, Kofi");
    assert_eq!(first.genre, "Afro House");
    assert_eq!(first.score, 1.0);
    assert_eq!(std::fs::read_to_string(&first.path).unwrap(), urls[0]);
    assert!(harness.cache_is_empty());
}

#[tokio::test]
async fn test_catalog_failure_continues_with_next_page() {
    let harness = Harness::new();
    let mut catalog = FakeCatalog::new().with_failing_page(2);
    let mut extractor = FixedExtractor::new();
    for page in [1, 3] {
        let url = format!("https://cdn.test/{page}.mp3");
        catalog = catalog.with_page(page, vec![track(&format!("Page {page}"), &[], Some("Techno"), None, &url)]);
        extractor = extractor.with(&url, matching());
    }
    let catalog = Arc::new(catalog);
    let controller = harness.controller(Arc::clone(&catalog), Arc::new(harness.audio()), extractor);

    let result = controller
        .run(&request(&["Techno"], &[], 1, 3), &reference(), None, &never)
        .await;

    assert_eq!(result.state, ScanState::Done);
    assert_eq!(catalog.requested(), vec![1, 2, 3]);
    assert_eq!(result.stats.pages_failed, 1);
    assert_eq!(result.stats.pages_scanned, 2);
    assert_eq!(result.kept, 2);
}

#[tokio::test]
async fn test_progress_reported_per_page() {
    let harness = Harness::new();
    let mut catalog = FakeCatalog::new();
    let mut extractor = FixedExtractor::new();
    for page in 5..=7 {
        let url = format!("https://cdn.test/{page}.mp3");
        catalog = catalog.with_page(page, vec![track(&format!("P{page}"), &[], Some("Techno"), None, &url)]);
        extractor = extractor.with(&url, matching());
    }
    let controller = harness.controller(Arc::new(catalog), Arc::new(harness.audio()), extractor);

    let seen = Mutex::new(Vec::new());
    let sink = |p: ScanProgress| seen.lock().unwrap().push(p);

    let result = controller
        .run(&request(&["Techno"], &[], 5, 7), &reference(), Some(&sink), &never)
        .await;

    assert_eq!(result.kept, 3);
    let seen = seen.into_inner().unwrap();
    let tuples: Vec<(u32, u32, usize)> = seen
        .iter()
        .map(|p| (p.current_page, p.total_pages, p.kept_count))
        .collect();
    assert_eq!(tuples, vec![(5, 3, 0), (6, 3, 1), (7, 3, 2)]);
}
