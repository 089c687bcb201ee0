//! Error types for Google API operations.
//!
//! Every client in this crate returns [`ApiError`]. The [`ApiErrorCode`]
//! separates four families callers usually branch on:
//!
//! - authentication/authorization failures ([`ApiError::is_auth`]),
//! - transport failures: network, HTTP status, unparsable responses
//!   ([`ApiError::is_transport`]),
//! - domain lookups that found nothing ([`ApiErrorCode::NotFound`]),
//! - local validation that failed before any request was sent
//!   ([`ApiErrorCode::Validation`]).

use std::fmt;
use thiserror::Error;

/// The category of an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// No usable credentials, or the server rejected them (401).
    AuthenticationFailed,
    /// Credentials are valid but lack permission (403).
    AuthorizationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// Server returned some other 4xx status.
    BadRequest,
    /// The requested resource does not exist (404).
    ResourceMissing,
    /// Response body could not be decoded.
    InvalidResponse,
    /// A named lookup (task list, contact group) matched nothing.
    NotFound,
    /// An argument was rejected before any request was made.
    Validation,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl ApiErrorCode {
    /// Returns true if the failure is transient.
    ///
    /// Nothing in this crate retries; this is a hint for callers that do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true for credential failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::AuthorizationFailed)
    }

    /// Returns true for failures raised by the HTTP exchange itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::RateLimited
                | Self::ServerError
                | Self::BadRequest
                | Self::ResourceMissing
                | Self::InvalidResponse
        )
    }

    /// Returns a stable snake_case name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::BadRequest => "bad_request",
            Self::ResourceMissing => "resource_missing",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while talking to a Google API.
#[derive(Debug, Error)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
    /// The API that produced the error (e.g. "calendar", "drive").
    service: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            service: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ServerError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn resource_missing(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ResourceMissing, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    /// Sets the service name for this error.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ApiErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn is_auth(&self) -> bool {
        self.code.is_auth()
    }

    pub fn is_transport(&self) -> bool {
        self.code.is_transport()
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ApiErrorCode::NotFound
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref service) = self.service {
            write!(f, "[{}] ", service)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_families() {
        assert!(ApiErrorCode::AuthenticationFailed.is_auth());
        assert!(ApiErrorCode::AuthorizationFailed.is_auth());
        assert!(!ApiErrorCode::AuthenticationFailed.is_transport());

        assert!(ApiErrorCode::ResourceMissing.is_transport());
        assert!(ApiErrorCode::InvalidResponse.is_transport());
        assert!(!ApiErrorCode::NotFound.is_transport());
        assert!(!ApiErrorCode::Validation.is_transport());
    }

    #[test]
    fn error_code_retryable() {
        assert!(ApiErrorCode::NetworkError.is_retryable());
        assert!(ApiErrorCode::RateLimited.is_retryable());
        assert!(ApiErrorCode::ServerError.is_retryable());
        assert!(!ApiErrorCode::AuthenticationFailed.is_retryable());
        assert!(!ApiErrorCode::ResourceMissing.is_retryable());
    }

    #[test]
    fn not_found_is_distinct_from_missing_resource() {
        let lookup = ApiError::not_found("task list \"Groceries\" not found");
        let http = ApiError::resource_missing("404");
        assert!(lookup.is_not_found());
        assert!(!http.is_not_found());
        assert!(http.is_transport());
    }

    #[test]
    fn error_display() {
        let err = ApiError::rate_limited("too many requests").with_service("drive");
        insta::assert_snapshot!(err.to_string(), @"[drive] rate_limited: too many requests");
        assert_eq!(err.service(), Some("drive"));
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ApiError::internal("failed to save token").with_source(io_err);
        assert!(err.source().is_some());
        assert_eq!(err.code(), ApiErrorCode::InternalError);
    }
}
