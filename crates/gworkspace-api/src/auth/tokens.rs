//! Persisted OAuth tokens.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A token set as returned by Google's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires (with a safety margin applied).
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes that were granted.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to be.
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if every `required` scope was granted.
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s == scope))
    }

    /// Returns the first required scope that was not granted.
    pub fn missing_scope<'a>(&self, required: &[&'a str]) -> Option<&'a str> {
        required
            .iter()
            .copied()
            .find(|scope| !self.scopes.iter().any(|s| s == scope))
    }

    /// Replaces the access token after a refresh.
    ///
    /// Google may rotate the refresh token; a new one replaces the stored one.
    pub fn refreshed(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

/// Token file with an in-memory copy.
///
/// Writes go to a temporary file which is then renamed over the target, and
/// the file is restricted to the owner on Unix.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: Mutex<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenInfo>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads tokens from disk. Returns `Ok(false)` when no file exists.
    pub fn load(&self) -> ApiResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ApiError::configuration(format!("failed to read token file: {}", e)).with_source(e)
        })?;
        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ApiError::configuration(format!("failed to parse token file: {}", e)).with_source(e)
        })?;

        info!(path = %self.path.display(), "loaded tokens");
        *self.lock() = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::configuration(format!("failed to create token directory: {}", e))
                    .with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ApiError::internal(format!("failed to serialize tokens: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ApiError::configuration(format!("failed to write token file: {}", e)).with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ApiError::configuration(format!("failed to restrict token file: {}", e))
                    .with_source(e)
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ApiError::configuration(format!("failed to rename token file: {}", e)).with_source(e)
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.lock().clone()
    }

    /// Replaces the stored tokens and persists them.
    pub fn set(&self, tokens: TokenInfo) -> ApiResult<()> {
        self.save(&tokens)?;
        *self.lock() = Some(tokens);
        Ok(())
    }

    /// Removes the tokens from memory and disk.
    pub fn clear(&self) -> ApiResult<()> {
        *self.lock() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ApiError::configuration(format!("failed to remove token file: {}", e))
                    .with_source(e)
            })?;
            info!(path = %self.path.display(), "cleared tokens");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
