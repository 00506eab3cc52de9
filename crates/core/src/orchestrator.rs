use crate::extractor::{DocumentExtractor, Extraction, SkipReason};
use crate::filter::PathFilter;
use crate::identity::derive_document_id;
use crate::ingest::{absolute_root, discover_indexable_files, Discovery};
use crate::models::{
    DeleteOutcome, DocumentRecord, IndexedDocument, PublishOutcome, ReconcileReport, ScanReport,
};
use crate::traits::{DocumentIndex, MetadataReader, TextExtractor};
use crate::watcher::FileEvent;
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const RECONCILE_PAGE_SIZE: usize = 1000;
pub const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Published,
    Skipped(SkipReason),
    Failed,
}

pub struct IndexCoordinator<I, T, M> {
    index: I,
    extractor: DocumentExtractor<T, M>,
    page_size: usize,
}

impl<I, T, M> IndexCoordinator<I, T, M>
where
    I: DocumentIndex + Send + Sync,
    T: TextExtractor + Send + Sync,
    M: MetadataReader + Send + Sync,
{
    pub fn new(index: I, extractor: DocumentExtractor<T, M>) -> Self {
        Self {
            index,
            extractor,
            page_size: RECONCILE_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn filter(&self) -> &PathFilter {
        self.extractor.filter()
    }

    pub async fn prepare_index(&self) {
        match self.index.ensure_index().await {
            Ok(()) => info!("index creation requested"),
            Err(error) => info!(error = %error, "index already exists or could not be created"),
        }
    }

    pub async fn index_path(&self, path: &Path) -> FileOutcome {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => self.index_file(path, metadata.len()).await,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "cannot stat file");
                FileOutcome::Failed
            }
        }
    }

    async fn index_file(&self, path: &Path, size: u64) -> FileOutcome {
        let record = match self.extractor.extract(path, size).await {
            Ok(Extraction::Document(record)) => record,
            Ok(Extraction::Skipped(reason)) => {
                match reason {
                    SkipReason::Empty | SkipReason::TooLarge { .. } => {
                        info!(path = %path.display(), size, reason = %reason, "skipping file")
                    }
                    SkipReason::Ignored | SkipReason::Unsupported => {
                        debug!(path = %path.display(), reason = %reason, "skipping file")
                    }
                }
                return FileOutcome::Skipped(reason);
            }
            Err(error) => {
                warn!(path = %path.display(), size, error = %error, "extraction failed");
                return FileOutcome::Failed;
            }
        };

        match self.publish(&record).await {
            PublishOutcome::Accepted => FileOutcome::Published,
            PublishOutcome::Failed => FileOutcome::Failed,
        }
    }

    pub async fn publish(&self, record: &DocumentRecord) -> PublishOutcome {
        match self.index.upsert_document(record).await {
            Ok(()) => {
                info!(path = %record.path, kind = record.kind.as_str(), "indexed");
                PublishOutcome::Accepted
            }
            Err(error) => {
                warn!(path = %record.path, error = %error, "publish failed");
                PublishOutcome::Failed
            }
        }
    }

    /// Removes the document derived from `path`. Returns `None` when the
    /// index call failed.
    pub async fn remove_path(&self, path: &Path) -> Option<DeleteOutcome> {
        let document_id = derive_document_id(path);
        self.remove_document(&document_id, &path.display().to_string()).await
    }

    async fn remove_document(&self, document_id: &str, path: &str) -> Option<DeleteOutcome> {
        match self.index.delete_document(document_id).await {
            Ok(DeleteOutcome::Deleted) => {
                info!(path, id = document_id, "removed from index");
                Some(DeleteOutcome::Deleted)
            }
            Ok(DeleteOutcome::NotFound) => {
                debug!(path, id = document_id, "not in index");
                Some(DeleteOutcome::NotFound)
            }
            Err(error) => {
                warn!(path, id = document_id, error = %error, "delete failed");
                None
            }
        }
    }

    pub async fn scan(&self, root: &Path) -> ScanReport {
        let walk_root = match absolute_root(root) {
            Ok(walk_root) => walk_root,
            Err(error) => {
                error!(root = %root.display(), error = %error, "cannot resolve scan root");
                return ScanReport::default();
            }
        };
        info!(root = %walk_root.display(), "scanning existing files");

        let filter = self.filter().clone();
        let discovery = match tokio::task::spawn_blocking(move || {
            discover_indexable_files(&walk_root, &filter)
        })
        .await
        {
            Ok(discovery) => discovery,
            Err(error) => {
                error!(error = %error, "directory walk aborted");
                Discovery::default()
            }
        };

        let mut report = ScanReport {
            skipped: discovery.ignored,
            ..ScanReport::default()
        };

        for path in discovery.candidates {
            report.processed += 1;
            if report.processed % PROGRESS_EVERY == 0 {
                info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    "scan progress"
                );
            }

            match self.index_path(&path).await {
                FileOutcome::Published => report.published += 1,
                FileOutcome::Failed => report.failed += 1,
                FileOutcome::Skipped(_) => {}
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            published = report.published,
            failed = report.failed,
            "scan finished"
        );
        report
    }

    /// Orphans are collected while paging and deleted afterwards, so removals
    /// never shift the offsets of pages still to be read.
    pub async fn reconcile(&self) -> ReconcileReport {
        info!(page_size = self.page_size, "reconciling index with filesystem");

        let mut report = ReconcileReport::default();
        let mut orphans: Vec<IndexedDocument> = Vec::new();
        let mut offset = 0;

        loop {
            let page = match self.index.list_documents(self.page_size, offset).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(offset, error = %error, "cannot fetch index page, stopping sweep");
                    break;
                }
            };

            let fetched = page.len();
            report.checked += fetched;

            for document in page {
                let Some(path) = document.path.as_deref() else {
                    continue;
                };
                let exists = tokio::fs::try_exists(path).await;
                match exists {
                    Ok(false) => orphans.push(document),
                    Ok(true) => {}
                    Err(error) => debug!(path, error = %error, "cannot check path, keeping"),
                }
            }

            if fetched < self.page_size {
                report.completed = true;
                break;
            }
            offset += fetched;
        }

        // Delete by the stored id, which may predate the current id scheme.
        for orphan in orphans {
            let path = orphan.path.as_deref().unwrap_or_default();
            if self.remove_document(&orphan.id, path).await == Some(DeleteOutcome::Deleted) {
                report.removed += 1;
            }
        }

        info!(
            checked = report.checked,
            removed = report.removed,
            completed = report.completed,
            "reconciliation finished"
        );
        report
    }

    pub async fn handle_event(&self, event: FileEvent) {
        match event {
            FileEvent::Changed(path) => {
                if self.filter().should_ignore(&path) {
                    debug!(path = %path.display(), "ignoring change");
                    return;
                }
                match tokio::fs::metadata(&path).await {
                    Ok(metadata) if metadata.is_dir() => {}
                    Ok(metadata) => {
                        info!(path = %path.display(), "file changed");
                        self.index_file(&path, metadata.len()).await;
                    }
                    Err(error) if error.kind() == ErrorKind::NotFound => {
                        info!(path = %path.display(), "changed file is gone");
                        self.remove_path(&path).await;
                    }
                    Err(error) => warn!(path = %path.display(), error = %error, "cannot stat changed file"),
                }
            }
            // Removals skip the filter; deleting an absent id is a no-op.
            FileEvent::Removed(path) => {
                info!(path = %path.display(), "file removed");
                self.remove_path(&path).await;
            }
        }
    }

    pub async fn watch<S>(
        &self,
        mut events: mpsc::Receiver<FileEvent>,
        heartbeat: Duration,
        shutdown: S,
    ) -> usize
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval_at(Instant::now() + heartbeat, heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut beats: u64 = 0;
        let mut handled = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(handled, "stopping watch loop");
                    break;
                }
                _ = ticker.tick() => {
                    beats += 1;
                    info!("heartbeat #{beats}");
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event).await;
                        handled += 1;
                    }
                    None => {
                        warn!("watch queue closed");
                        break;
                    }
                },
            }
        }

        handled
    }
}
