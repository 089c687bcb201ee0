//! reqwest-backed [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{BoxFuture, Media, Request, Transport};
use crate::auth::CredentialStore;
use crate::error::{ApiError, ApiResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

enum Body {
    Empty,
    Json(Value),
    Multipart { boundary: String, bytes: Vec<u8> },
}

/// Sends requests to Google over HTTPS, authenticating each with a bearer
/// token for the target service's scope.
pub struct HttpTransport {
    http_client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTransport {
    /// Creates a transport using `credentials` for every request.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom request timeout.
    pub fn with_timeout(credentials: Arc<dyn CredentialStore>, timeout: Duration) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;
        Ok(Self {
            http_client,
            credentials,
        })
    }

    async fn send(&self, method: Method, request: &Request, body: Body) -> ApiResult<Value> {
        let service = request.service.name();
        let scopes = [request.service.scope()];
        let token = self.credentials.valid_token(&scopes).await?;

        debug!(service, method = %method, path = %request.path, "sending request");

        let mut builder = self
            .http_client
            .request(method, request.url())
            .bearer_auth(token)
            .query(&request.query);

        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart { boundary, bytes } => builder
                .header(
                    CONTENT_TYPE,
                    format!("multipart/related; boundary={}", boundary),
                )
                .body(bytes),
        };

        let response = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                format!("request failed: {}", e)
            };
            ApiError::network(message).with_service(service).with_source(e)
        })?;

        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let text = response.text().await.map_err(|e| {
            ApiError::network(format!("failed to read response: {}", e))
                .with_service(service)
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(error_for_status(status, retry_after, &text).with_service(service));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::invalid_response(format!("failed to parse response: {}", e))
                .with_service(service)
                .with_source(e)
        })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(self.send(Method::GET, request, Body::Empty))
    }

    fn create<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(self.send(Method::POST, request, Body::Json(body)))
    }

    fn update<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(self.send(Method::PATCH, request, Body::Json(body)))
    }

    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(self.send(Method::DELETE, request, Body::Empty))
    }

    fn upload<'a>(
        &'a self,
        request: &'a Request,
        metadata: Value,
        media: Media,
    ) -> BoxFuture<'a, ApiResult<Value>> {
        let boundary: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let bytes = multipart_related(&boundary, &metadata, &media);
        Box::pin(self.send(Method::POST, request, Body::Multipart { boundary, bytes }))
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Maps a non-success HTTP status to an [`ApiError`].
fn error_for_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::authentication("access token expired or invalid"),
        StatusCode::FORBIDDEN => ApiError::authorization(format!("access denied: {}", body.trim())),
        StatusCode::NOT_FOUND => ApiError::resource_missing("resource not found"),
        StatusCode::TOO_MANY_REQUESTS => ApiError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        s if s.is_server_error() => ApiError::server(format!("API error ({}): {}", s, body.trim())),
        s => ApiError::bad_request(format!("API error ({}): {}", s, body.trim())),
    }
}

/// Builds a `multipart/related` body: a JSON metadata part followed by the media part.
pub fn multipart_related(boundary: &str, metadata: &Value, media: &Media) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: {}\r\n\r\n", media.mime_type).as_bytes(),
    );
    body.extend_from_slice(&media.bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;
    use serde_json::json;

    #[test]
    fn status_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ApiErrorCode::AuthenticationFailed),
            (StatusCode::FORBIDDEN, ApiErrorCode::AuthorizationFailed),
            (StatusCode::NOT_FOUND, ApiErrorCode::ResourceMissing),
            (StatusCode::TOO_MANY_REQUESTS, ApiErrorCode::RateLimited),
            (StatusCode::BAD_REQUEST, ApiErrorCode::BadRequest),
            (StatusCode::CONFLICT, ApiErrorCode::BadRequest),
            (StatusCode::INTERNAL_SERVER_ERROR, ApiErrorCode::ServerError),
            (StatusCode::SERVICE_UNAVAILABLE, ApiErrorCode::ServerError),
        ];
        for (status, code) in cases {
            assert_eq!(error_for_status(status, None, "").code(), code, "{status}");
        }
    }

    #[test]
    fn rate_limit_mentions_retry_after() {
        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, Some(30), "");
        insta::assert_snapshot!(err.to_string(), @"rate_limited: rate limit exceeded, retry after 30 seconds");
    }

    #[test]
    fn retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);
        headers.insert(RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), Some(12));
    }

    #[test]
    fn multipart_layout() {
        let media = Media {
            mime_type: "image/png".to_string(),
            bytes: b"PNGDATA".to_vec(),
        };
        let body = multipart_related("xyz", &json!({"name": "a.png"}), &media);
        let text = String::from_utf8(body).unwrap();
        insta::assert_snapshot!(text.replace("\r\n", "\n").trim_end(), @r#"
        --xyz
        Content-Type: application/json; charset=UTF-8

        {"name":"a.png"}
        --xyz
        Content-Type: image/png

        PNGDATA
        --xyz--
        "#);
    }
}
