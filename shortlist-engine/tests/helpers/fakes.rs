//! In-memory collaborators for controller tests

use async_trait::async_trait;
use shortlist_engine::models::{CatalogArtist, CatalogTrack, FeatureVector};
use shortlist_engine::services::{
    AudioSource, CatalogError, CatalogSource, ExtractionError, FeatureExtractor, FetchedAudio,
};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Catalog track with the fields the controller looks at
pub fn track(title: &str, artists: &[&str], genre: Option<&str>, date: Option<&str>, url: &str) -> CatalogTrack {
    CatalogTrack {
        id: None,
        title: Some(title.to_string()),
        genre: genre.map(str::to_string),
        release_date: date.map(str::to_string),
        artists: Some(
            artists
                .iter()
                .map(|name| CatalogArtist {
                    name: Some(name.to_string()),
                })
                .collect(),
        ),
        stream_url: Some(url.to_string()),
    }
}

/// Catalog backed by a page map; pages listed in `failing` return an error
#[derive(Default)]
pub struct FakeCatalog {
    pub pages: HashMap<u32, Vec<CatalogTrack>>,
    pub failing: HashSet<u32>,
    requested: Mutex<Vec<u32>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, tracks: Vec<CatalogTrack>) -> Self {
        self.pages.insert(page, tracks);
        self
    }

    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Pages requested so far, in request order
    pub fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_page(&self, page: u32) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.requested.lock().unwrap().push(page);
        if self.failing.contains(&page) {
            return Err(CatalogError::Unavailable {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn estimate_last_page(&self) -> Option<u32> {
        self.pages.keys().max().copied()
    }
}

/// Audio source writing the URL itself as the payload into `cache_dir`
pub struct FakeAudio {
    cache_dir: PathBuf,
    unavailable: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeAudio {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            unavailable: HashSet::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_unavailable(mut self, url: &str) -> Self {
        self.unavailable.insert(url.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSource for FakeAudio {
    async fn fetch(&self, url: &str) -> Option<FetchedAudio> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.unavailable.contains(url) {
            return None;
        }

        let mut file = tempfile::Builder::new()
            .suffix(".mp3")
            .tempfile_in(&self.cache_dir)
            .ok()?;
        file.write_all(url.as_bytes()).ok()?;
        Some(FetchedAudio::new(file.into_temp_path(), "mp3", url.len() as u64))
    }
}

/// Extractor that maps payload contents (the URL) to preset vectors
///
/// Payloads without a preset fail as undecodable audio.
#[derive(Default)]
pub struct FixedExtractor {
    by_url: HashMap<String, FeatureVector>,
}

impl FixedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, features: FeatureVector) -> Self {
        self.by_url.insert(url.to_string(), features);
        self
    }
}

impl FeatureExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn extract(&self, path: &Path) -> Result<FeatureVector, ExtractionError> {
        let body = std::fs::read_to_string(path)?;
        self.by_url
            .get(&body)
            .copied()
            .ok_or_else(|| ExtractionError::AudioDecode(format!("no preset for {body}")))
    }
}
