//! CLI, configuration file, command implementations
//!
//! This crate provides the `gworkspace` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
