//! Drive commands.

use std::path::Path;
use std::sync::Arc;

use gworkspace_api::drive::{DriveClient, DriveFiles, FileQuery, PermissionRole, PermissionType};
use gworkspace_api::transport::Transport;

use crate::error::CliResult;

/// Lists files; custom `fields` switch the output to raw JSON.
pub async fn ls(
    transport: Arc<dyn Transport>,
    parent: Option<String>,
    folders: bool,
    fields: Vec<String>,
) -> CliResult<()> {
    let client = DriveClient::new(transport);
    let mut query = FileQuery::new();
    query.parent = parent;
    if !fields.is_empty() {
        query = query.with_fields(fields);
    }
    let files = if folders {
        client.list_folders(&query).await?
    } else {
        client.list_files(&query).await?
    };
    print!("{}", render_files(&files)?);
    Ok(())
}

pub async fn upload(
    transport: Arc<dyn Transport>,
    path: &Path,
    name: Option<&str>,
    parent: Option<&str>,
) -> CliResult<()> {
    let file = DriveClient::new(transport)
        .upload_file(path, name, None, parent)
        .await?;
    println!("{}  {}", file.id, file.name);
    Ok(())
}

pub async fn mkdir(transport: Arc<dyn Transport>, name: &str, parent: Option<&str>) -> CliResult<()> {
    let folder = DriveClient::new(transport).create_folder(name, parent).await?;
    println!("{}  {}", folder.id, folder.name);
    Ok(())
}

/// Grants `role` on a file to one user.
pub async fn share(
    transport: Arc<dyn Transport>,
    file_id: &str,
    email: &str,
    role: &str,
    notify: bool,
) -> CliResult<()> {
    // Parse before any request is made.
    let role: PermissionRole = role.parse()?;
    let id = DriveClient::new(transport)
        .create_permission(file_id, role, PermissionType::User, email, notify)
        .await?;
    println!("{}", id);
    Ok(())
}

pub fn render_files(files: &DriveFiles) -> CliResult<String> {
    Ok(match files {
        DriveFiles::Ids(files) => files
            .iter()
            .map(|file| format!("{}  {}\n", file.id, file.name))
            .collect(),
        DriveFiles::Raw(values) => format!("{}\n", serde_json::to_string_pretty(values)?),
    })
}
