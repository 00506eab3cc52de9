use crate::error::IngestError;
use crate::filter::PathFilter;
use crate::models::{DocumentRecord, DocumentType, ExtractionStrategy, IngestionOptions};
use crate::traits::{MetadataReader, TextExtractor};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;

pub const TRUNCATION_MARKER: &str = "\n... (truncated)";
pub const PREVIEW_SUFFIX: &str = "...";
pub const AUDIO_PREVIEW_FALLBACK: &str = "Audio file";

const AUDIO_PREVIEW_KEYS: [&str; 3] = ["Title", "Artist", "Album"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Ignored,
    Empty,
    TooLarge { size: u64, limit: u64 },
    Unsupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ignored => write!(f, "ignored path"),
            SkipReason::Empty => write!(f, "empty file"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file too large ({size} bytes, limit {limit})")
            }
            SkipReason::Unsupported => write!(f, "unsupported file type"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Document(DocumentRecord),
    Skipped(SkipReason),
}

pub struct DocumentExtractor<T, M> {
    text: T,
    metadata: M,
    filter: PathFilter,
    options: IngestionOptions,
}

impl<T, M> DocumentExtractor<T, M>
where
    T: TextExtractor + Send + Sync,
    M: MetadataReader + Send + Sync,
{
    pub fn new(text: T, metadata: M, filter: PathFilter, options: IngestionOptions) -> Self {
        Self {
            text,
            metadata,
            filter,
            options,
        }
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    pub fn precheck(&self, path: &Path, size: u64) -> Result<DocumentType, SkipReason> {
        if self.filter.should_ignore(path) {
            return Err(SkipReason::Ignored);
        }
        if size == 0 {
            return Err(SkipReason::Empty);
        }
        if size > self.options.max_file_size {
            return Err(SkipReason::TooLarge {
                size,
                limit: self.options.max_file_size,
            });
        }
        DocumentType::from_path(path).ok_or(SkipReason::Unsupported)
    }

    pub async fn extract(&self, path: &Path, size: u64) -> Result<Extraction, IngestError> {
        let kind = match self.precheck(path, size) {
            Ok(kind) => kind,
            Err(reason) => return Ok(Extraction::Skipped(reason)),
        };

        let mut record = DocumentRecord::new(path, kind)?;

        match kind.strategy() {
            ExtractionStrategy::PlainText => {
                let text = read_text_lossy(path, self.options.max_file_size).await?;
                self.attach_text(&mut record, &text);
            }
            ExtractionStrategy::RemoteText => {
                let text = self.text.extract_text(path).await?;
                self.attach_text(&mut record, &text);
            }
            ExtractionStrategy::AudioMetadata => {
                let metadata = self.metadata.read_metadata(path).await?;
                record.preview = Some(audio_preview(&metadata));
                let dropped = record.merge_extra(metadata);
                if dropped > 0 {
                    tracing::debug!(path = %path.display(), dropped, "metadata keys shadowed by core fields");
                }
            }
        }

        Ok(Extraction::Document(record))
    }

    fn attach_text(&self, record: &mut DocumentRecord, text: &str) {
        let (content, truncated) = truncate_content(text, self.options.max_content_chars);
        if truncated {
            tracing::info!(
                path = %record.path,
                limit = self.options.max_content_chars,
                "content truncated"
            );
        }
        record.preview = Some(build_preview(text, self.options.preview_chars));
        record.content = Some(content);
    }
}

pub fn truncate_content(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}{TRUNCATION_MARKER}", &text[..cut]), true),
        None => (text.to_string(), false),
    }
}

pub fn build_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{PREVIEW_SUFFIX}", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn audio_preview(metadata: &Map<String, Value>) -> String {
    let parts = AUDIO_PREVIEW_KEYS
        .iter()
        .filter_map(|key| {
            let rendered = match metadata.get(*key)? {
                Value::String(value) => value.trim().to_string(),
                Value::Null => return None,
                other => other.to_string(),
            };
            (!rendered.is_empty()).then(|| format!("{key}: {rendered}"))
        })
        .collect::<Vec<_>>();

    if parts.is_empty() {
        AUDIO_PREVIEW_FALLBACK.to_string()
    } else {
        parts.join(" | ")
    }
}

async fn read_text_lossy(path: &Path, limit: u64) -> Result<String, IngestError> {
    let file = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
