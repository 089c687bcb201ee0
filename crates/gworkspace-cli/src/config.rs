//! CLI configuration.
//!
//! All settings live in `~/.config/gworkspace/config.toml` unless `--config`
//! or `GWORKSPACE_CONFIG` points elsewhere:
//!
//! ```toml
//! [auth]
//! client_id = "pass::google/gworkspace-id"
//! client_secret = "env::GWORKSPACE_CLIENT_SECRET"
//! # or: credentials_file = "~/Downloads/client_secret.json"
//! scopes = ["https://www.googleapis.com/auth/calendar"]
//!
//! [calendar]
//! time_zone = "Europe/Paris"
//! calendar_ids = ["primary", "team@example.com"]
//! parallelism = 4
//! on_expansion_error = "skip"
//! ```

use std::path::{Path, PathBuf};

use gworkspace_api::auth::{AuthConfig, OAuthCredentials};
use gworkspace_api::calendar::{CalendarClient, ExpansionErrorPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub auth: AuthSettings,
    pub calendar: CalendarSettings,
}

/// OAuth client and token settings.
///
/// `client_id` and `client_secret` accept secret references (`pass::…`,
/// `env::…`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Client-secrets JSON downloaded from the Google Cloud Console.
    pub credentials_file: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
    /// Replaces the default scope set when present.
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA zone for naive times and display; UTC when unset.
    pub time_zone: Option<String>,
    pub parallelism: Option<usize>,
    pub calendar_ids: Vec<String>,
    /// `skip` or `fail`.
    pub on_expansion_error: Option<String>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            time_zone: None,
            parallelism: None,
            calendar_ids: vec!["primary".to_string()],
            on_expansion_error: None,
        }
    }
}

impl CliConfig {
    /// Loads `path`, or the default file if `path` is `None`.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `~/.config/gworkspace/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gworkspace")
            .join("config.toml")
    }
}

impl AuthSettings {
    /// Resolves the OAuth client.
    ///
    /// A `credentials_file` wins over inline `client_id`/`client_secret`.
    pub fn resolve_credentials(&self) -> CliResult<OAuthCredentials> {
        if let Some(path) = &self.credentials_file {
            return Ok(OAuthCredentials::from_file(path)?);
        }

        let (Some(raw_id), Some(raw_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(CliError::Config(format!(
                "Google OAuth client not configured. Add to {}:\n  \
                 [auth]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 or set credentials_file to the client-secrets JSON",
                CliConfig::default_path().display()
            )));
        };

        let credentials = OAuthCredentials::new(
            crate::secret::resolve(raw_id)?,
            crate::secret::resolve(raw_secret)?,
        );
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn to_auth_config(&self) -> CliResult<AuthConfig> {
        let mut config = AuthConfig::new(self.resolve_credentials()?);
        if let Some(path) = &self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(scopes) = &self.scopes {
            config = config.with_scopes(scopes.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

impl CalendarSettings {
    /// Applies these settings to a calendar client.
    pub fn apply(&self, mut client: CalendarClient) -> CliResult<CalendarClient> {
        if let Some(name) = &self.time_zone {
            client = client.with_time_zone_name(name)?;
        }
        if let Some(parallelism) = self.parallelism {
            client = client.with_parallelism(parallelism);
        }
        if let Some(policy) = &self.on_expansion_error {
            client = client.with_expansion_policy(policy.parse::<ExpansionErrorPolicy>()?);
        }
        Ok(client)
    }
}
