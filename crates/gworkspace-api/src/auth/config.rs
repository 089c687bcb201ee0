//! OAuth client credentials and credential-store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Scopes requested when none are configured: one per supported API.
pub const DEFAULT_SCOPES: [&str; 7] = [
    "https://www.googleapis.com/auth/documents.readonly",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/tasks",
    "https://www.googleapis.com/auth/contacts",
    "https://www.googleapis.com/auth/books",
];

/// An OAuth 2.0 client registration from Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Shape of a downloaded client-secrets file.
///
/// Accepts the console's `installed`/`web` wrappers as well as a flat
/// `{client_id, client_secret}` object.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a client-secrets JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from client-secrets JSON.
    pub fn from_json(json: &str) -> ApiResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            ApiError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(secrets) = file.installed.or(file.web) {
            return Ok(Self::new(secrets.client_id, secrets.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ApiError::configuration(
                "credentials file must contain an 'installed'/'web' section or top-level 'client_id'/'client_secret'",
            )),
        }
    }

    /// Checks that the client id looks like a Google OAuth client and the secret is set.
    pub fn validate(&self) -> ApiResult<()> {
        if self.client_id.is_empty() {
            return Err(ApiError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ApiError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(ApiError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

/// Configuration for [`OAuthCredentialStore`](super::OAuthCredentialStore).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub credentials: OAuthCredentials,
    /// Where tokens are persisted.
    pub token_path: PathBuf,
    /// Scopes requested during consent.
    pub scopes: Vec<String>,
    /// Timeout for token endpoint requests.
    pub timeout: Duration,
    /// Ports tried, in order, for the loopback redirect server.
    pub loopback_port_range: (u16, u16),
}

impl AuthConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
        }
    }

    /// `~/.local/share/gworkspace/google-token.json`.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gworkspace")
            .join("google-token.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Replaces the default scope set.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        self.credentials.validate()?;

        if self.scopes.is_empty() {
            return Err(ApiError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ApiError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credential_validation() {
        assert!(credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "s").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "s").validate().is_err());
        assert!(
            OAuthCredentials::new("x.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn defaults_request_every_service() {
        let config = AuthConfig::new(credentials());
        assert_eq!(config.scopes.len(), DEFAULT_SCOPES.len());
        assert!(
            config
                .scopes
                .iter()
                .any(|s| s == "https://www.googleapis.com/auth/calendar")
        );
        assert!(config.token_path.ends_with("gworkspace/google-token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_scopes_replace_defaults() {
        let config = AuthConfig::new(credentials())
            .with_scopes(vec!["https://www.googleapis.com/auth/tasks".to_string()]);
        assert_eq!(config.scopes, ["https://www.googleapis.com/auth/tasks"]);
    }

    #[test]
    fn empty_scopes_are_rejected() {
        let err = AuthConfig::new(credentials())
            .with_scopes(vec![])
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::ConfigurationError);
    }

    #[test]
    fn inverted_port_range_is_rejected() {
        let config = AuthConfig::new(credentials()).with_loopback_port_range(9010, 9000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn client_secrets_formats() {
        let installed = r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "s", "project_id": "p"}}"#;
        let web = r#"{"web": {"client_id": "b.apps.googleusercontent.com", "client_secret": "s"}}"#;
        let flat = r#"{"client_id": "c.apps.googleusercontent.com", "client_secret": "s", "refresh_token": "r"}"#;

        assert_eq!(
            OAuthCredentials::from_json(installed).unwrap().client_id,
            "a.apps.googleusercontent.com"
        );
        assert_eq!(
            OAuthCredentials::from_json(web).unwrap().client_id,
            "b.apps.googleusercontent.com"
        );
        assert_eq!(
            OAuthCredentials::from_json(flat).unwrap().client_id,
            "c.apps.googleusercontent.com"
        );
    }

    #[test]
    fn client_secrets_errors() {
        let err = OAuthCredentials::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn client_secrets_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "f.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(
            OAuthCredentials::from_file(&path).unwrap().client_secret,
            "s"
        );
        assert!(OAuthCredentials::from_file(dir.path().join("missing.json")).is_err());
    }
}
