//! Books commands.

use std::sync::Arc;

use gworkspace_api::books::{BooksClient, SearchOptions, VolumeSearch};
use gworkspace_api::transport::Transport;

use crate::error::CliResult;

pub async fn search(transport: Arc<dyn Transport>, query: &str, max_results: u32) -> CliResult<()> {
    let options = SearchOptions {
        max_results,
        ..Default::default()
    };
    let result = BooksClient::new(transport).search(query, options).await?;
    print!("{}", render_search(&result));
    Ok(())
}

pub fn render_search(result: &VolumeSearch) -> String {
    let mut out = format!("{} results\n", result.total_items);
    for volume in &result.volumes {
        out.push_str(&volume.title);
        if !volume.authors.is_empty() {
            out.push_str(" by ");
            out.push_str(&volume.authors.join(", "));
        }
        if let Some(date) = &volume.published_date {
            out.push_str(&format!(" ({})", date));
        }
        out.push('\n');
    }
    out
}
