//! Remote catalog client
//!
//! One request per page: `GET {base}/tracks?page=N`, bearer-authenticated.
//! Failures are returned to the caller; nothing is retried here.

use crate::models::{CatalogPage, CatalogTrack};
use async_trait::async_trait;
use reqwest::header::REFERER;
use serde::Deserialize;
use shortlist_common::config::CatalogConfig;
use thiserror::Error;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog unavailable ({status}): {body}")]
    Unavailable { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of catalog pages
///
/// Implemented by [`CatalogClient`]; tests substitute in-memory catalogs.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Tracks listed on page `page` (1-based), in listing order
    async fn fetch_page(&self, page: u32) -> Result<Vec<CatalogTrack>, CatalogError>;

    /// Best-effort last page number, `None` when unknown
    async fn estimate_last_page(&self) -> Option<u32>;
}

/// Page body as sent by the catalog
///
/// Track records are decoded one at a time so a single malformed record
/// does not cost the whole page.
#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    limit: u64,
    #[serde(default)]
    tracks: Vec<serde_json::Value>,
}

impl RawPage {
    fn into_page(self, page: u32) -> CatalogPage {
        let mut tracks = Vec::with_capacity(self.tracks.len());
        for (index, value) in self.tracks.into_iter().enumerate() {
            match serde_json::from_value::<CatalogTrack>(value) {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    tracing::warn!(page, index, error = %e, "Skipping malformed catalog record");
                }
            }
        }

        CatalogPage {
            total: self.total,
            limit: self.limit,
            tracks,
        }
    }
}

/// HTTP catalog client
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    referer: Option<String>,
    token: Option<String>,
}

impl CatalogClient {
    /// Build a client from catalog settings
    ///
    /// Without a token, requests go out unauthenticated.
    pub fn new(config: &CatalogConfig, token: Option<String>) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if token.is_none() {
            tracing::warn!("No catalog token configured, requests will be unauthenticated");
        }

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            referer: config.referer.clone(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode one page, keeping the paging totals
    pub async fn fetch_catalog_page(&self, page: u32) -> Result<CatalogPage, CatalogError> {
        let url = format!("{}/tracks", self.base_url);

        tracing::debug!(page, url = %url, "Querying catalog");

        let mut request = self.http_client.get(&url).query(&[("page", page)]);
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Unavailable {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawPage = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let catalog_page = raw.into_page(page);

        tracing::debug!(
            page,
            tracks = catalog_page.tracks.len(),
            total = catalog_page.total,
            "Retrieved catalog page"
        );

        Ok(catalog_page)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_page(&self, page: u32) -> Result<Vec<CatalogTrack>, CatalogError> {
        Ok(self.fetch_catalog_page(page).await?.tracks)
    }

    async fn estimate_last_page(&self) -> Option<u32> {
        match self.fetch_catalog_page(1).await {
            Ok(page) => {
                let last = page.last_page();
                if last.is_none() {
                    tracing::warn!("Catalog reports no items");
                }
                last
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not estimate last catalog page");
                None
            }
        }
    }
}
