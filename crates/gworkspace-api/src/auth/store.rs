//! Sources of bearer tokens.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::AuthConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};
use crate::error::{ApiError, ApiResult};
use crate::transport::BoxFuture;

/// Hands out bearer tokens that are valid right now.
pub trait CredentialStore: Send + Sync {
    /// Returns an access token covering `scopes`, refreshing it if needed.
    ///
    /// Fails with an authentication error when no usable credentials exist.
    fn valid_token<'a>(&'a self, scopes: &'a [&'a str]) -> BoxFuture<'a, ApiResult<String>>;
}

/// A fixed token, e.g. from `GWORKSPACE_TOKEN` or `gcloud auth print-access-token`.
///
/// No scope checking or refresh is performed.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialStore for StaticToken {
    fn valid_token<'a>(&'a self, _scopes: &'a [&'a str]) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(async move { Ok(self.token.clone()) })
    }
}

/// OAuth tokens persisted on disk and refreshed against Google's token endpoint.
pub struct OAuthCredentialStore {
    config: AuthConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    /// Serializes refreshes so concurrent requests share one.
    refresh_lock: Mutex<()>,
}

impl OAuthCredentialStore {
    /// Validates `config` and loads any previously stored tokens.
    pub fn new(config: AuthConfig) -> ApiResult<Self> {
        config.validate()?;
        let storage = TokenStorage::new(config.token_path.clone());
        if let Err(e) = storage.load() {
            warn!("ignoring unreadable token file: {}", e);
        }
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;
        Ok(Self {
            config,
            storage,
            oauth,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns true if tokens covering every configured scope are stored.
    pub fn is_authenticated(&self) -> bool {
        let scopes: Vec<&str> = self.config.scopes.iter().map(String::as_str).collect();
        self.storage
            .get()
            .is_some_and(|t| t.has_scopes(&scopes) && (!t.is_expired() || t.refresh_token.is_some()))
    }

    /// Runs the interactive consent flow and stores the resulting tokens.
    pub async fn authorize(&self) -> ApiResult<()> {
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.storage.set(tokens)?;
        info!(path = %self.storage.path().display(), "stored new tokens");
        Ok(())
    }

    /// Runs consent only when `force` is set or no usable tokens exist.
    ///
    /// Returns whether consent was run.
    pub async fn authorize_if_needed(&self, force: bool) -> ApiResult<bool> {
        if !force && self.is_authenticated() {
            debug!("existing tokens are usable, skipping consent");
            return Ok(false);
        }
        self.authorize().await?;
        Ok(true)
    }

    /// Forgets stored tokens.
    pub fn logout(&self) -> ApiResult<()> {
        self.storage.clear()
    }

    async fn token_for(&self, scopes: &[&str]) -> ApiResult<String> {
        let _guard = self.refresh_lock.lock().await;

        let mut tokens = self.storage.get().ok_or_else(|| {
            ApiError::authentication("not authenticated, run `gworkspace auth` first")
        })?;

        if let Some(scope) = tokens.missing_scope(scopes) {
            return Err(ApiError::authentication(format!(
                "stored token was not granted {}, run `gworkspace auth --force`",
                scope
            )));
        }

        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            ApiError::authentication("access token expired and no refresh token is stored")
        })?;

        debug!("access token expired, refreshing");
        let response = self.oauth.refresh(&refresh_token).await?;
        tokens.refreshed(
            response.access_token,
            response.expires_in,
            response.refresh_token,
        );
        self.storage.set(tokens.clone())?;
        Ok(tokens.access_token)
    }

    /// Stores tokens obtained elsewhere.
    pub fn import(&self, tokens: TokenInfo) -> ApiResult<()> {
        self.storage.set(tokens)
    }
}

impl CredentialStore for OAuthCredentialStore {
    fn valid_token<'a>(&'a self, scopes: &'a [&'a str]) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(self.token_for(scopes))
    }
}
