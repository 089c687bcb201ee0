//! Google Docs document metadata.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::ApiResult;
use crate::transport::{Request, Service, Transport, decode, segment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    #[serde(default)]
    title: String,
}

/// Client for the Docs API.
pub struct DocsClient {
    transport: Arc<dyn Transport>,
}

impl DocsClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn get(&self, document_id: &str) -> ApiResult<Document> {
        let request = Request::new(Service::Docs, format!("documents/{}", segment(document_id)))
            .query("fields", "documentId,title");
        let record: DocumentRecord = decode(self.transport.get(&request).await?, "document")?;
        Ok(Document {
            id: document_id.to_string(),
            title: record.title,
        })
    }
}
