use crate::{DeleteOutcome, DocumentRecord, IndexError, IndexedDocument, IngestError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;

#[async_trait]
pub trait DocumentIndex {
    async fn ensure_index(&self) -> Result<(), IndexError>;

    async fn upsert_document(&self, document: &DocumentRecord) -> Result<(), IndexError>;

    async fn delete_document(&self, document_id: &str) -> Result<DeleteOutcome, IndexError>;

    async fn list_documents(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<IndexedDocument>, IndexError>;
}

#[async_trait]
pub trait TextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, IngestError>;
}

#[async_trait]
pub trait MetadataReader {
    async fn read_metadata(&self, path: &Path) -> Result<Map<String, Value>, IngestError>;
}
