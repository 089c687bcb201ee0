//! Google Books volume search.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::transport::{Request, Service, Transport, decode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrintType {
    All,
    #[default]
    Books,
    Magazines,
}

impl PrintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Books => "BOOKS",
            Self::Magazines => "MAGAZINES",
        }
    }
}

impl fmt::Display for PrintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "BOOKS" => Ok(Self::Books),
            "MAGAZINES" => Ok(Self::Magazines),
            _ => Err(ApiError::validation(format!(
                "{:?} is not a valid print type, must be one of all, books, magazines",
                s
            ))),
        }
    }
}

/// Paging and filtering for [`BooksClient::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub print_type: PrintType,
    pub start_index: u32,
    pub max_results: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            print_type: PrintType::Books,
            start_index: 0,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSearch {
    pub total_items: u64,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesResponse {
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<VolumeRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeRecord {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
}

impl From<VolumeRecord> for Volume {
    fn from(record: VolumeRecord) -> Self {
        Self {
            id: record.id,
            title: record.volume_info.title,
            authors: record.volume_info.authors,
            published_date: record.volume_info.published_date,
        }
    }
}

/// Client for the Books API.
pub struct BooksClient {
    transport: Arc<dyn Transport>,
}

impl BooksClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs one `volumes.list` query; paging is left to the caller.
    pub async fn search(&self, q: &str, options: SearchOptions) -> ApiResult<VolumeSearch> {
        let request = Request::new(Service::Books, "volumes")
            .query("q", q)
            .query("printType", options.print_type.as_str())
            .query("startIndex", options.start_index.to_string())
            .query("maxResults", options.max_results.to_string());
        let response: VolumesResponse = decode(self.transport.get(&request).await?, "volumes")?;
        Ok(VolumeSearch {
            total_items: response.total_items,
            volumes: response.items.into_iter().map(Volume::from).collect(),
        })
    }
}
