use crate::error::IngestError;
use crate::identity::derive_document_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const MEBIBYTE: u64 = 1024 * 1024;

pub const CORE_FIELDS: [&str; 6] = ["id", "path", "filename", "type", "content", "preview"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Markdown,
    Doc,
    Docx,
    Pdf,
    Txt,
    Odt,
    Rtf,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    PlainText,
    RemoteText,
    AudioMetadata,
}

impl DocumentType {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let kind = match extension.to_ascii_lowercase().as_str() {
            "md" => Self::Markdown,
            "doc" => Self::Doc,
            "docx" => Self::Docx,
            "pdf" => Self::Pdf,
            "txt" => Self::Txt,
            "odt" => Self::Odt,
            "rtf" => Self::Rtf,
            "mp3" | "wav" | "flac" | "m4a" => Self::Audio,
            _ => return None,
        };
        Some(kind)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn strategy(self) -> ExtractionStrategy {
        match self {
            Self::Markdown => ExtractionStrategy::PlainText,
            Self::Doc | Self::Docx | Self::Pdf | Self::Txt | Self::Odt | Self::Rtf => {
                ExtractionStrategy::RemoteText
            }
            Self::Audio => ExtractionStrategy::AudioMetadata,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Odt => "odt",
            Self::Rtf => "rtf",
            Self::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub path: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new(path: &Path, kind: DocumentType) -> Result<Self, IngestError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

        Ok(Self {
            id: derive_document_id(path),
            path: path.to_string_lossy().to_string(),
            filename,
            kind,
            content: None,
            preview: None,
            extra: Map::new(),
        })
    }

    // Core fields win; returns how many keys were dropped.
    pub fn merge_extra(&mut self, attributes: Map<String, Value>) -> usize {
        let mut dropped = 0;
        for (key, value) in attributes {
            if CORE_FIELDS.contains(&key.as_str()) {
                dropped += 1;
                continue;
            }
            self.extra.insert(key, value);
        }
        dropped
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedDocument {
    pub id: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub results: Vec<IndexedDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Accepted,
    Failed,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub max_file_size: u64,
    pub max_content_chars: usize,
    pub preview_chars: usize,
}

impl IngestionOptions {
    pub fn with_max_file_size_mb(megabytes: u64) -> Self {
        Self {
            max_file_size: megabytes.saturating_mul(MEBIBYTE),
            ..Self::default()
        }
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            max_file_size: 10 * MEBIBYTE,
            max_content_chars: 50_000,
            preview_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub processed: usize,
    pub skipped: usize,
    pub published: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub removed: usize,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extensions_map_case_insensitively() {
        assert_eq!(DocumentType::from_extension("MD"), Some(DocumentType::Markdown));
        assert_eq!(DocumentType::from_extension("Pdf"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_extension("m4a"), Some(DocumentType::Audio));
        assert_eq!(DocumentType::from_extension("exe"), None);
        assert_eq!(DocumentType::from_path(Path::new("/data/no_extension")), None);
    }

    #[test]
    fn text_types_go_to_the_extraction_service() {
        assert_eq!(DocumentType::Txt.strategy(), ExtractionStrategy::RemoteText);
        assert_eq!(DocumentType::Markdown.strategy(), ExtractionStrategy::PlainText);
        assert_eq!(DocumentType::Audio.strategy(), ExtractionStrategy::AudioMetadata);
    }

    #[test]
    fn core_fields_win_over_extra_attributes() -> Result<(), Box<dyn std::error::Error>> {
        let mut record = DocumentRecord::new(Path::new("/data/music/song.mp3"), DocumentType::Audio)?;
        let mut attributes = Map::new();
        attributes.insert("Title".to_string(), json!("Foo"));
        attributes.insert("path".to_string(), json!("/elsewhere"));
        attributes.insert("type".to_string(), json!("MP3"));

        let dropped = record.merge_extra(attributes);
        assert_eq!(dropped, 2);

        let wire = serde_json::to_value(&record)?;
        assert_eq!(wire["path"], "/data/music/song.mp3");
        assert_eq!(wire["type"], "audio");
        assert_eq!(wire["Title"], "Foo");
        assert!(wire.get("content").is_none());
        Ok(())
    }

    #[test]
    fn max_file_size_is_configured_in_mebibytes() {
        assert_eq!(IngestionOptions::with_max_file_size_mb(250).max_file_size, 250 * MEBIBYTE);
        assert_eq!(IngestionOptions::default().max_file_size, 10 * MEBIBYTE);
    }
}
