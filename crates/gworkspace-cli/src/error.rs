//! CLI error types.

use gworkspace_api::ApiError;
use thiserror::Error;

use crate::secret::SecretError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// A secret reference could not be resolved.
    #[error(transparent)]
    Secret(#[from] SecretError),
    /// A Google API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Invalid command-line input.
    #[error("invalid argument: {0}")]
    Usage(String),
    /// Output could not be serialized.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
