//! Authentication commands.

use gworkspace_api::auth::OAuthCredentialStore;
use tracing::info;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Runs the OAuth consent flow unless usable tokens are already stored.
pub async fn login(config: &CliConfig, force: bool) -> CliResult<()> {
    let store = OAuthCredentialStore::new(config.auth.to_auth_config()?)?;

    if !force && store.is_authenticated() {
        println!("Already authenticated.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    store.authorize().await?;

    info!("authentication successful");
    println!("Authentication successful!");
    println!("Tokens saved to {}", store.config().token_path.display());
    Ok(())
}

/// Deletes the stored tokens.
pub fn logout(config: &CliConfig) -> CliResult<()> {
    let store = OAuthCredentialStore::new(config.auth.to_auth_config()?)?;
    store.logout()?;
    println!("Removed {}", store.config().token_path.display());
    Ok(())
}
