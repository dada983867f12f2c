//! Content fetcher: streams a track's audio payload into the cache directory
//!
//! Each attempt writes a fresh temp file. A failed attempt's partial file is
//! deleted when its handle drops, before the next attempt starts.

use crate::services::feature_extractor::SUPPORTED_EXTENSIONS;
use crate::utils::retry_with_backoff;
use async_trait::async_trait;
use reqwest::header::REFERER;
use shortlist_common::config::{CatalogConfig, FetchConfig};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Extension used when the URL does not name a known audio format
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Failure of a single download attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Cache write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A downloaded payload owned exclusively by its holder
///
/// The file is deleted when this value drops unless it was committed.
#[derive(Debug)]
pub struct FetchedAudio {
    path: TempPath,
    extension: String,
    bytes: u64,
}

impl FetchedAudio {
    pub fn new(path: TempPath, extension: impl Into<String>, bytes: u64) -> Self {
        Self {
            path,
            extension: extension.into(),
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Give up ownership of the transient file for a commit
    pub fn into_temp_path(self) -> TempPath {
        self.path
    }

    /// Delete the transient file now; a failure is logged, not returned
    pub fn discard(self) {
        let shown = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            tracing::warn!(path = %shown, error = %e, "Failed to delete transient file");
        }
    }
}

/// Source of audio payloads
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Download `url`; `None` once every attempt has failed
    async fn fetch(&self, url: &str) -> Option<FetchedAudio>;
}

/// HTTP content fetcher with bounded retry
pub struct ContentFetcher {
    http_client: reqwest::Client,
    referer: Option<String>,
    token: Option<String>,
    cache_dir: PathBuf,
    config: FetchConfig,
}

impl ContentFetcher {
    /// `cache_dir` must exist and outlive the fetcher's payloads
    ///
    /// `token` is the same catalog bearer token the catalog client uses.
    pub fn new(
        catalog: &CatalogConfig,
        token: Option<String>,
        config: FetchConfig,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(catalog.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            referer: catalog.referer.clone(),
            token,
            cache_dir: cache_dir.into(),
            config,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    async fn fetch_once(&self, url: &str, extension: &str) -> Result<FetchedAudio, FetchError> {
        let mut request = self.http_client.get(url);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let mut response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let (file, path) = tempfile::Builder::new()
            .prefix("fetch-")
            .suffix(&format!(".{extension}"))
            .tempfile_in(&self.cache_dir)?
            .into_parts();

        let chunk_size = self.config.chunk_size.max(1);
        let mut writer = BufWriter::with_capacity(chunk_size, tokio::fs::File::from_std(file));
        let mut bytes = 0u64;

        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        writer.flush().await?;
        drop(writer);

        Ok(FetchedAudio::new(path, extension, bytes))
    }
}

#[async_trait]
impl AudioSource for ContentFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedAudio> {
        let extension = extension_for_url(url);
        let extension = extension.as_str();

        let result = retry_with_backoff(
            "audio fetch",
            self.config.max_attempts,
            self.config.backoff(),
            |_| self.fetch_once(url, extension),
        )
        .await;

        match result {
            Ok(audio) => {
                tracing::debug!(url, bytes = audio.bytes(), "Fetched audio payload");
                Some(audio)
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Audio fetch failed after retries");
                None
            }
        }
    }
}

/// Audio extension named by the URL path, else [`DEFAULT_EXTENSION`]
pub fn extension_for_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let file_name = parsed.path_segments()?.last()?.to_string();
            let (_, ext) = file_name.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
