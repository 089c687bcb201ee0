//! Credentials for Google APIs.
//!
//! Every request goes through a [`CredentialStore`], which hands out a
//! bearer token for the scope of the target service. Two stores exist:
//!
//! - [`OAuthCredentialStore`]: installed-app OAuth with PKCE, tokens kept in
//!   a JSON file and refreshed silently when they expire.
//! - [`StaticToken`]: a token obtained elsewhere, used as-is.

mod config;
mod oauth;
mod store;
mod tokens;

pub use config::{AuthConfig, DEFAULT_SCOPES, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, TokenResponse};
pub use store::{CredentialStore, OAuthCredentialStore, StaticToken};
pub use tokens::{TokenInfo, TokenStorage};
