use crate::deadline::with_deadline;
use crate::models::{DeleteOutcome, DocumentPage, DocumentRecord, IndexedDocument};
use crate::traits::DocumentIndex;
use crate::IndexError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const MEILISEARCH_BACKEND: &str = "meilisearch";
pub const DEFAULT_INDEX_UID: &str = "files";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const INDEX_CREATE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MeilisearchStore {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
    index_uid: String,
    request_timeout: Duration,
}

impl MeilisearchStore {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        index_uid: impl Into<String>,
    ) -> Result<Self, IndexError> {
        Url::parse(endpoint)?;

        Ok(Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            index_uid: index_uid.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn index_uid(&self) -> &str {
        &self.index_uid
    }

    fn documents_url(&self) -> String {
        format!("{}/indexes/{}/documents", self.endpoint, self.index_uid)
    }
}

async fn backend_error(response: Response) -> IndexError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    IndexError::BackendResponse {
        backend: MEILISEARCH_BACKEND.to_string(),
        details: if body.is_empty() {
            status.to_string()
        } else {
            format!("{status} - {body}")
        },
    }
}

#[async_trait]
impl DocumentIndex for MeilisearchStore {
    async fn ensure_index(&self) -> Result<(), IndexError> {
        with_deadline("index creation", INDEX_CREATE_TIMEOUT, async {
            let response = self
                .client
                .post(format!("{}/indexes", self.endpoint))
                .bearer_auth(&self.api_key)
                .json(&json!({ "uid": self.index_uid, "primaryKey": "id" }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }
            Ok(())
        })
        .await
    }

    async fn upsert_document(&self, document: &DocumentRecord) -> Result<(), IndexError> {
        with_deadline("document upsert", self.request_timeout, async {
            let response = self
                .client
                .post(self.documents_url())
                .bearer_auth(&self.api_key)
                .json(&[document])
                .send()
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
                _ => Err(backend_error(response).await),
            }
        })
        .await
    }

    async fn delete_document(&self, document_id: &str) -> Result<DeleteOutcome, IndexError> {
        with_deadline("document delete", self.request_timeout, async {
            let response = self
                .client
                .delete(format!("{}/{}", self.documents_url(), document_id))
                .bearer_auth(&self.api_key)
                .send()
                .await?;

            match response.status() {
                StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
                status if status.is_success() => Ok(DeleteOutcome::Deleted),
                _ => Err(backend_error(response).await),
            }
        })
        .await
    }

    async fn list_documents(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<IndexedDocument>, IndexError> {
        with_deadline("document listing", self.request_timeout, async {
            let response = self
                .client
                .get(self.documents_url())
                .bearer_auth(&self.api_key)
                .query(&[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("fields", "id,path".to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }

            let body = response.bytes().await?;
            let page: DocumentPage = serde_json::from_slice(&body)?;
            Ok(page.results)
        })
        .await
    }
}
