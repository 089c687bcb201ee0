//! Google Drive: file listing, uploads, folders and sharing permissions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::transport::{Media, Request, Service, Transport, decode, drain_pages, segment};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const DEFAULT_FIELDS: [&str; 2] = ["id", "name"];

/// A file or folder known by name and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWithId {
    pub name: String,
    pub id: String,
}

/// Filters and projection for [`DriveClient::list_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    /// Only children of this folder.
    pub parent: Option<String>,
    /// File fields to return; `None` means `id, name`.
    pub fields: Option<Vec<String>>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Listing result: typed with the default fields, raw JSON with custom ones.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveFiles {
    Ids(Vec<FileWithId>),
    Raw(Vec<Value>),
}

impl DriveFiles {
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(files) => files.len(),
            Self::Raw(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Infers an upload mimetype from the file extension.
///
/// Only JPEG and PNG images are recognised.
pub fn mimetype_for_path(path: &Path) -> ApiResult<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        _ => Err(ApiError::validation(format!(
            "no mimetype known for {}",
            path.display()
        ))),
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let valid: Vec<_> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        ApiError::validation(format!(
                            "{:?} is not a valid {}, must be one of {}",
                            s,
                            $what,
                            valid.join(", ")
                        ))
                    })
            }
        }
    };
}

string_enum!(
    /// Access level granted by a permission.
    PermissionRole, "role", {
        Owner => "owner",
        Organizer => "organizer",
        FileOrganizer => "fileOrganizer",
        Writer => "writer",
        Commenter => "commenter",
        Reader => "reader",
    }
);

string_enum!(
    /// Kind of grantee of a permission.
    PermissionType, "type", {
        User => "user",
        Group => "group",
        Domain => "domain",
        Anyone => "anyone",
    }
);

/// A sharing permission on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

/// Escapes a value for a single-quoted Drive query literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Client for the Drive API.
pub struct DriveClient {
    transport: Arc<dyn Transport>,
}

impl DriveClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Lists non-trashed files.
    pub async fn list_files(&self, query: &FileQuery) -> ApiResult<DriveFiles> {
        self.list(query, None).await
    }

    /// Lists non-trashed folders.
    pub async fn list_folders(&self, query: &FileQuery) -> ApiResult<DriveFiles> {
        self.list(query, Some(FOLDER_MIME_TYPE)).await
    }

    async fn list(&self, query: &FileQuery, mimetype: Option<&str>) -> ApiResult<DriveFiles> {
        let mut terms = vec!["trashed=false".to_string()];
        if let Some(mimetype) = mimetype {
            terms.push(format!("mimeType={}", quote_literal(mimetype)));
        }
        if let Some(parent) = &query.parent {
            terms.push(format!("{} in parents", quote_literal(parent)));
        }

        let fields = match &query.fields {
            Some(fields) => fields.join(", "),
            None => DEFAULT_FIELDS.join(", "),
        };

        let request = Request::new(Service::Drive, "files")
            .query("q", terms.join(" and "))
            .query("spaces", "drive")
            .query("fields", format!("nextPageToken, files({})", fields))
            .items_key("files");
        let files = drain_pages(self.transport.as_ref(), &request).await?;

        if query.fields.is_some() {
            return Ok(DriveFiles::Raw(files));
        }
        files
            .into_iter()
            .map(|file| decode(file, "drive file"))
            .collect::<ApiResult<Vec<FileWithId>>>()
            .map(DriveFiles::Ids)
    }

    /// Uploads a local file.
    ///
    /// `name` defaults to the file name and `mimetype` is inferred from the
    /// extension when absent. An unknown extension fails before anything is read.
    pub async fn upload_file(
        &self,
        path: &Path,
        name: Option<&str>,
        mimetype: Option<&str>,
        parent: Option<&str>,
    ) -> ApiResult<FileWithId> {
        let mimetype = match mimetype {
            Some(m) => m.to_string(),
            None => mimetype_for_path(path)?.to_string(),
        };
        let name = match name {
            Some(n) => n.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    ApiError::validation(format!("{} has no file name", path.display()))
                })?,
        };

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::internal(format!("failed to read {}: {}", path.display(), e)).with_source(e)
        })?;

        let mut metadata = json!({"name": name, "mimeType": mimetype});
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let request = Request::new(Service::DriveUpload, "files")
            .query("uploadType", "multipart")
            .query("fields", "id");
        let size = bytes.len();
        let response = self
            .transport
            .upload(
                &request,
                metadata,
                Media {
                    mime_type: mimetype,
                    bytes,
                },
            )
            .await?;
        let created: Created = decode(response, "upload response")?;

        info!(name = %name, id = %created.id, size, "uploaded file");
        Ok(FileWithId {
            name,
            id: created.id,
        })
    }

    /// Creates a folder, optionally inside `parent`.
    pub async fn create_folder(&self, name: &str, parent: Option<&str>) -> ApiResult<FileWithId> {
        let mut metadata = json!({"name": name, "mimeType": FOLDER_MIME_TYPE});
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }
        let request = Request::new(Service::Drive, "files").query("fields", "id");
        let created: Created = decode(
            self.transport.create(&request, metadata).await?,
            "folder",
        )?;
        Ok(FileWithId {
            name: name.to_string(),
            id: created.id,
        })
    }

    /// Lists every permission on a file.
    pub async fn list_permissions(&self, file_id: &str) -> ApiResult<Vec<Permission>> {
        let request = Request::new(
            Service::Drive,
            format!("files/{}/permissions", segment(file_id)),
        )
        .query("fields", "nextPageToken,permissions(id, role, emailAddress)")
        .items_key("permissions");
        drain_pages(self.transport.as_ref(), &request)
            .await?
            .into_iter()
            .map(|p| decode(p, "permission"))
            .collect()
    }

    /// Shares a file and returns the new permission id.
    pub async fn create_permission(
        &self,
        file_id: &str,
        role: PermissionRole,
        kind: PermissionType,
        email_address: &str,
        send_notification: bool,
    ) -> ApiResult<String> {
        let request = Request::new(
            Service::Drive,
            format!("files/{}/permissions", segment(file_id)),
        )
        .query("sendNotificationEmail", send_notification.to_string());
        let body = json!({
            "role": role.as_str(),
            "type": kind.as_str(),
            "emailAddress": email_address,
        });
        let created: Created = decode(self.transport.create(&request, body).await?, "permission")?;
        debug!(file = file_id, permission = %created.id, %role, "created permission");
        Ok(created.id)
    }

    /// Changes the role of an existing permission.
    pub async fn update_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        role: PermissionRole,
    ) -> ApiResult<String> {
        let request = permission_request(file_id, permission_id);
        let updated: Created = decode(
            self.transport
                .update(&request, json!({"role": role.as_str()}))
                .await?,
            "permission",
        )?;
        Ok(updated.id)
    }

    pub async fn delete_permission(&self, file_id: &str, permission_id: &str) -> ApiResult<()> {
        self.transport
            .delete(&permission_request(file_id, permission_id))
            .await?;
        Ok(())
    }
}

fn permission_request(file_id: &str, permission_id: &str) -> Request {
    Request::new(
        Service::Drive,
        format!(
            "files/{}/permissions/{}",
            segment(file_id),
            segment(permission_id)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;
    use crate::transport::fake::{FakeTransport, Op};

    fn setup() -> (Arc<FakeTransport>, DriveClient) {
        let fake = Arc::new(FakeTransport::new());
        (fake.clone(), DriveClient::new(fake))
    }

    #[test]
    fn mimetypes() {
        assert_eq!(mimetype_for_path(Path::new("a/photo.JPG")).unwrap(), "image/jpeg");
        assert_eq!(mimetype_for_path(Path::new("x.jpeg")).unwrap(), "image/jpeg");
        assert_eq!(mimetype_for_path(Path::new("x.png")).unwrap(), "image/png");

        let err = mimetype_for_path(Path::new("notes.txt")).unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::Validation);
        assert!(mimetype_for_path(Path::new("README")).is_err());
    }

    #[test]
    fn permission_parsing() {
        assert_eq!("fileOrganizer".parse::<PermissionRole>().unwrap(), PermissionRole::FileOrganizer);
        assert_eq!("anyone".parse::<PermissionType>().unwrap(), PermissionType::Anyone);

        let err = "admin".parse::<PermissionRole>().unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::Validation);
        insta::assert_snapshot!(
            err.message(),
            @r#""admin" is not a valid role, must be one of owner, organizer, fileOrganizer, writer, commenter, reader"#
        );
        assert!("User".parse::<PermissionType>().is_err());
    }

    #[test]
    fn query_literals_are_escaped() {
        assert_eq!(quote_literal("abc"), "'abc'");
        assert_eq!(quote_literal("it's"), r"'it\'s'");
    }

    #[tokio::test]
    async fn list_files_default_fields() {
        let (fake, client) = setup();
        fake.push_page(
            Service::Drive,
            "files",
            json!({"files": [{"id": "1", "name": "a.png"}], "nextPageToken": "t"}),
        );
        fake.push_page(Service::Drive, "files", json!({"files": [{"id": "2", "name": "b.png"}]}));

        let files = client
            .list_files(&FileQuery::new().in_parent("root123"))
            .await
            .unwrap();
        assert_eq!(
            files,
            DriveFiles::Ids(vec![
                FileWithId { name: "a.png".into(), id: "1".into() },
                FileWithId { name: "b.png".into(), id: "2".into() },
            ])
        );

        let request = &fake.calls()[0].request;
        assert_eq!(request.param("q"), Some("trashed=false and 'root123' in parents"));
        assert_eq!(request.param("spaces"), Some("drive"));
        assert_eq!(request.param("fields"), Some("nextPageToken, files(id, name)"));
    }

    #[tokio::test]
    async fn list_folders_with_custom_fields_is_raw() {
        let (fake, client) = setup();
        fake.push_page(
            Service::Drive,
            "files",
            json!({"files": [{"id": "f", "name": "Photos", "modifiedTime": "2024-01-01T00:00:00Z"}]}),
        );

        let files = client
            .list_folders(&FileQuery::new().with_fields(["id", "name", "modifiedTime"]))
            .await
            .unwrap();
        match files {
            DriveFiles::Raw(items) => assert_eq!(items[0]["modifiedTime"], "2024-01-01T00:00:00Z"),
            other => panic!("expected raw files, got {other:?}"),
        }

        let request = &fake.calls()[0].request;
        assert_eq!(
            request.param("q"),
            Some("trashed=false and mimeType='application/vnd.google-apps.folder'")
        );
        assert_eq!(
            request.param("fields"),
            Some("nextPageToken, files(id, name, modifiedTime)")
        );
    }

    #[tokio::test]
    async fn upload_sends_metadata_and_bytes() {
        let (fake, client) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"\x89PNG").unwrap();
        fake.push_response(Service::DriveUpload, "files", json!({"id": "new-id"}));

        let file = client
            .upload_file(&path, None, None, Some("folder-1"))
            .await
            .unwrap();
        assert_eq!(file, FileWithId { name: "cat.png".into(), id: "new-id".into() });

        let call = &fake.calls()[0];
        assert_eq!(call.op, Op::Upload);
        assert_eq!(call.request.param("uploadType"), Some("multipart"));
        assert_eq!(
            call.body,
            Some(json!({"name": "cat.png", "mimeType": "image/png", "parents": ["folder-1"]}))
        );
        let media = call.media.as_ref().unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.bytes, b"\x89PNG");
    }

    #[tokio::test]
    async fn upload_with_unknown_extension_sends_nothing() {
        let (fake, client) = setup();
        let err = client
            .upload_file(Path::new("/nonexistent/report.pdf"), None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::Validation);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_an_io_failure() {
        use std::error::Error;
        let (fake, client) = setup();
        let dir = tempfile::tempdir().unwrap();
        let err = client
            .upload_file(&dir.path().join("missing.png"), None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::InternalError);
        assert!(err.source().is_some());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn create_folder_metadata() {
        let (fake, client) = setup();
        fake.push_response(Service::Drive, "files", json!({"id": "fid"}));
        let folder = client.create_folder("Photos", None).await.unwrap();
        assert_eq!(folder.id, "fid");
        assert_eq!(
            fake.calls()[0].body,
            Some(json!({"name": "Photos", "mimeType": FOLDER_MIME_TYPE}))
        );
    }

    #[tokio::test]
    async fn permission_lifecycle() {
        let (fake, client) = setup();
        fake.push_page(
            Service::Drive,
            "files/doc1/permissions",
            json!({"permissions": [{"id": "p1", "role": "owner", "emailAddress": "me@example.com"}]}),
        );
        fake.push_response(Service::Drive, "files/doc1/permissions", json!({"id": "p2"}));
        fake.push_response(Service::Drive, "files/doc1/permissions/p2", json!({"id": "p2"}));
        fake.push_response(Service::Drive, "files/doc1/permissions/p2", Value::Null);

        let perms = client.list_permissions("doc1").await.unwrap();
        assert_eq!(perms[0].email_address.as_deref(), Some("me@example.com"));

        let id = client
            .create_permission("doc1", PermissionRole::Reader, PermissionType::User, "friend@example.com", false)
            .await
            .unwrap();
        assert_eq!(id, "p2");
        client
            .update_permission("doc1", "p2", PermissionRole::Writer)
            .await
            .unwrap();
        client.delete_permission("doc1", "p2").await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls[1].request.param("sendNotificationEmail"), Some("false"));
        assert_eq!(
            calls[1].body,
            Some(json!({"role": "reader", "type": "user", "emailAddress": "friend@example.com"}))
        );
        assert_eq!(calls[2].op, Op::Update);
        assert_eq!(calls[2].body, Some(json!({"role": "writer"})));
        assert_eq!(calls[3].op, Op::Delete);
    }
}
