use crate::deadline::with_deadline;
use crate::error::IngestError;
use crate::traits::TextExtractor;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

pub const TIKA_BACKEND: &str = "tika";
pub const DEFAULT_TIKA_TIMEOUT: Duration = Duration::from_secs(60);

pub struct TikaExtractor {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl TikaExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIKA_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextExtractor for TikaExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        with_deadline("tika extraction", self.timeout, async {
            let file = tokio::fs::File::open(path).await?;
            let response = self
                .client
                .put(&self.endpoint)
                .header(ACCEPT, "text/plain")
                .body(file)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(IngestError::BackendResponse {
                    backend: TIKA_BACKEND.to_string(),
                    details: response.status().to_string(),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }
}
