//! The HTTP boundary shared by every service client.
//!
//! Clients never talk to reqwest directly. They build a [`Request`] naming
//! the [`Service`] and resource path, then hand it to a [`Transport`]. The
//! production implementation is [`HttpTransport`]; tests substitute an
//! in-memory fake.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

pub use http::{HttpTransport, multipart_related};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The Google API a request is addressed to.
///
/// Each service knows its REST base URL and the OAuth scope it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Calendar,
    Sheets,
    Drive,
    /// Media upload endpoint of the Drive API.
    DriveUpload,
    Tasks,
    People,
    Books,
    Docs,
}

impl Service {
    /// Short lowercase name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Sheets => "sheets",
            Self::Drive | Self::DriveUpload => "drive",
            Self::Tasks => "tasks",
            Self::People => "people",
            Self::Books => "books",
            Self::Docs => "docs",
        }
    }

    /// REST base URL, without a trailing slash.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Calendar => "https://www.googleapis.com/calendar/v3",
            Self::Sheets => "https://sheets.googleapis.com/v4",
            Self::Drive => "https://www.googleapis.com/drive/v3",
            Self::DriveUpload => "https://www.googleapis.com/upload/drive/v3",
            Self::Tasks => "https://tasks.googleapis.com/tasks/v1",
            Self::People => "https://people.googleapis.com/v1",
            Self::Books => "https://www.googleapis.com/books/v1",
            Self::Docs => "https://docs.googleapis.com/v1",
        }
    }

    /// OAuth scope required to call this service.
    pub fn scope(&self) -> &'static str {
        match self {
            Self::Calendar => "https://www.googleapis.com/auth/calendar",
            Self::Sheets => "https://www.googleapis.com/auth/spreadsheets",
            Self::Drive | Self::DriveUpload => "https://www.googleapis.com/auth/drive",
            Self::Tasks => "https://www.googleapis.com/auth/tasks",
            Self::People => "https://www.googleapis.com/auth/contacts",
            Self::Books => "https://www.googleapis.com/auth/books",
            Self::Docs => "https://www.googleapis.com/auth/documents.readonly",
        }
    }
}

/// Percent-encodes a single path segment (calendar ids contain `@` and `#`).
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// A request against one resource of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target service.
    pub service: Service,
    /// Resource path relative to the service base URL, already encoded.
    pub path: String,
    /// Query parameters; keys may repeat.
    pub query: Vec<(String, String)>,
    /// Field of a list response that holds the items.
    pub items_key: &'static str,
}

impl Request {
    /// Creates a request for `path` on `service`.
    pub fn new(service: Service, path: impl Into<String>) -> Self {
        Self {
            service,
            path: path.into(),
            query: Vec::new(),
            items_key: "items",
        }
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends a query parameter when `value` is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Sets the list-response field holding the items.
    pub fn items_key(mut self, key: &'static str) -> Self {
        self.items_key = key;
        self
    }

    /// Returns the full URL, without query string.
    pub fn url(&self) -> String {
        format!("{}/{}", self.service.base_url(), self.path)
    }

    /// Returns the first value of a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

impl Page {
    /// Splits a list response into its items and continuation token.
    ///
    /// A missing items field is an empty page; an empty token means "last page".
    pub fn from_response(mut response: Value, items_key: &str) -> Self {
        let items = match response.get_mut(items_key).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let next_page_token = response
            .get("nextPageToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from);
        Self {
            items,
            next_page_token,
        }
    }
}

/// Binary content for a media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The operations every service client is built from.
pub trait Transport: Send + Sync {
    /// Fetches a single resource.
    fn get<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>>;

    /// Fetches one page of a collection.
    fn list<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Page>> {
        Box::pin(async move {
            let response = self.get(request).await?;
            Ok(Page::from_response(response, request.items_key))
        })
    }

    /// Creates a resource or invokes a custom method (POST).
    fn create<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>>;

    /// Partially updates a resource (PATCH).
    fn update<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>>;

    /// Deletes a resource.
    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>>;

    /// Creates a resource from metadata plus binary content.
    fn upload<'a>(
        &'a self,
        request: &'a Request,
        metadata: Value,
        media: Media,
    ) -> BoxFuture<'a, ApiResult<Value>>;
}

/// Lists every page of a collection and concatenates the items.
///
/// Follows `nextPageToken` until it is absent or empty.
pub async fn drain_pages(transport: &dyn Transport, request: &Request) -> ApiResult<Vec<Value>> {
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page_request = request.clone().query_opt("pageToken", page_token.take());
        let page = transport.list(&page_request).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!(
        service = request.service.name(),
        path = %request.path,
        pages,
        items = items.len(),
        "drained list"
    );
    Ok(items)
}

/// Decodes a JSON value into a typed response.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ApiResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::invalid_response(format!("failed to decode {}: {}", what, e)))
}
