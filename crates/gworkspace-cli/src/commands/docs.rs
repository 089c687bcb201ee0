//! Docs commands.

use std::sync::Arc;

use gworkspace_api::docs::DocsClient;
use gworkspace_api::transport::Transport;

use crate::error::CliResult;

pub async fn title(transport: Arc<dyn Transport>, id: &str) -> CliResult<()> {
    let document = DocsClient::new(transport).get(id).await?;
    println!("{}", document.title);
    Ok(())
}
