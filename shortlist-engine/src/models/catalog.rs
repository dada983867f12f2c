//! Remote catalog records
//!
//! Wire format of `GET /tracks?page=N`:
//! ```json
//! {"total": 1234, "limit": 50,
//!  "tracks": [{"title": "...", "genre": "...", "release_date": "2025-03-14",
//!              "artists": [{"name": "..."}], "url": "https://..."}]}
//! ```
//!
//! Only `title` and `url` are required to process a track; everything else
//! is optional and unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Credited artist of a catalog track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: Option<String>,
}

/// One track record from a catalog page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    /// Catalog identifier (number or string depending on the catalog)
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub genre: Option<String>,
    /// ISO-like date, year first ("2025-03-14")
    pub release_date: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<CatalogArtist>>,
    /// Streamable preview URL
    #[serde(rename = "url")]
    pub stream_url: Option<String>,
}

impl CatalogTrack {
    /// Trimmed title, `None` when missing or blank
    pub fn title_text(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Stream URL, `None` when missing or blank
    pub fn stream_url_text(&self) -> Option<&str> {
        non_blank(self.stream_url.as_deref())
    }

    /// Trimmed genre, `None` when missing or blank
    pub fn genre_name(&self) -> Option<&str> {
        non_blank(self.genre.as_deref())
    }

    /// Artist names joined with ", " (empty when no named artist)
    pub fn artist_display(&self) -> String {
        self.artists
            .iter()
            .flatten()
            .filter_map(|a| non_blank(a.name.as_deref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Year prefix of `release_date` ("2024-05-01" → "2024")
    pub fn release_year(&self) -> Option<&str> {
        non_blank(self.release_date.as_deref())
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
    }

    /// Short identity for log lines: catalog id when present, else title
    pub fn identity(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(serde_json::Value::Null) | None => {
                self.title_text().unwrap_or("<untitled>").to_string()
            }
            Some(other) => other.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Decoded catalog page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    /// Total number of items in the catalog
    pub total: u64,
    /// Page size used by the catalog
    pub limit: u64,
    pub tracks: Vec<CatalogTrack>,
}

impl CatalogPage {
    /// `ceil(total / limit)`, `None` when the catalog reports no items
    pub fn last_page(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        let limit = self.limit.max(1);
        u32::try_from(self.total.div_ceil(limit)).ok()
    }
}
