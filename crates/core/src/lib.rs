pub mod deadline;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod identity;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod stores;
pub mod traits;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use deadline::with_deadline;
pub use error::{DeadlineExceeded, IndexError, IngestError, WatchError};
pub use extractor::{DocumentExtractor, Extraction, SkipReason};
pub use filter::{PathFilter, DEFAULT_IGNORED_DIRS};
pub use identity::derive_document_id;
pub use ingest::{absolute_root, discover_indexable_files, Discovery};
pub use models::{
    DeleteOutcome, DocumentRecord, DocumentType, IndexedDocument, IngestionOptions,
    PublishOutcome, ReconcileReport, ScanReport,
};
pub use orchestrator::{FileOutcome, IndexCoordinator};
pub use services::{ExifToolReader, TikaExtractor};
pub use stores::MeilisearchStore;
pub use traits::{DocumentIndex, MetadataReader, TextExtractor};
pub use watcher::{FileEvent, FileWatcher, WatchStrategy, EVENT_QUEUE_CAPACITY};
