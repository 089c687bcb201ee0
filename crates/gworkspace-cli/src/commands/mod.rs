//! Command implementations.
//!
//! Each command renders its output through a pure `render_*` function so the
//! formatting can be tested without a network.

pub mod auth;
pub mod books;
pub mod calendar;
pub mod config;
pub mod contacts;
pub mod docs;
pub mod drive;
pub mod sheets;
pub mod tasks;

use std::sync::Arc;

use gworkspace_api::auth::{CredentialStore, OAuthCredentialStore, StaticToken};
use gworkspace_api::transport::{HttpTransport, Transport};
use tracing::debug;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Builds the transport shared by the service commands.
///
/// An explicit `token` bypasses OAuth entirely.
pub fn transport(config: &CliConfig, token: Option<&str>) -> CliResult<Arc<dyn Transport>> {
    let credentials: Arc<dyn CredentialStore> = match token {
        Some(token) => {
            debug!("using static bearer token");
            Arc::new(StaticToken::new(token))
        }
        None => Arc::new(OAuthCredentialStore::new(config.auth.to_auth_config()?)?),
    };
    Ok(Arc::new(HttpTransport::new(credentials)?))
}
