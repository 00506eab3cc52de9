use crate::error::WatchError;
use crate::ingest::absolute_root;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Changed(path) | FileEvent::Removed(path) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    Native,
    Poll { interval: Duration },
}

impl Default for WatchStrategy {
    fn default() -> Self {
        WatchStrategy::Poll {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct FileWatcher {
    root: PathBuf,
    _watcher: Box<dyn Watcher + Send>,
}

impl FileWatcher {
    /// Blocks while polling snapshots the tree, and the callback uses
    /// `blocking_send`; call through `spawn_blocking`.
    pub fn start(
        root: &Path,
        strategy: WatchStrategy,
        events: mpsc::Sender<FileEvent>,
    ) -> Result<Self, WatchError> {
        if !root.exists() {
            return Err(WatchError::MissingRoot(root.display().to_string()));
        }
        let root = absolute_root(root)?;

        let handler = move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for file_event in convert_event(&event) {
                    if events.blocking_send(file_event).is_err() {
                        tracing::warn!("event queue closed");
                        break;
                    }
                }
            }
            Err(error) => tracing::error!(error = %error, "watch error"),
        };

        let mut watcher: Box<dyn Watcher + Send> = match strategy {
            WatchStrategy::Native => Box::new(RecommendedWatcher::new(handler, Config::default())?),
            WatchStrategy::Poll { interval } => Box::new(PollWatcher::new(
                handler,
                Config::default().with_poll_interval(interval),
            )?),
        };

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), ?strategy, "watching");

        Ok(Self {
            root,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub fn convert_event(event: &Event) -> Vec<FileEvent> {
    let changed = || -> Vec<FileEvent> {
        event.paths.iter().cloned().map(FileEvent::Changed).collect()
    };
    let removed = || -> Vec<FileEvent> {
        event.paths.iter().cloned().map(FileEvent::Removed).collect()
    };

    match &event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Remove(_) => removed(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => vec![
            FileEvent::Removed(event.paths[0].clone()),
            FileEvent::Changed(event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => removed(),
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other => changed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::workspace;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn make_event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    #[test]
    fn create_and_modify_become_changes() {
        let path = PathBuf::from("/data/notes/todo.md");

        let created = make_event(EventKind::Create(CreateKind::File), vec![path.clone()]);
        assert_eq!(convert_event(&created), vec![FileEvent::Changed(path.clone())]);

        let written = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            vec![path.clone()],
        );
        assert_eq!(convert_event(&written), vec![FileEvent::Changed(path.clone())]);

        // Polling reports content changes as mtime updates.
        let touched = make_event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            vec![path.clone()],
        );
        assert_eq!(convert_event(&touched), vec![FileEvent::Changed(path)]);
    }

    #[test]
    fn remove_becomes_removal() {
        let path = PathBuf::from("/data/old.pdf");
        let event = make_event(EventKind::Remove(RemoveKind::File), vec![path.clone()]);
        assert_eq!(convert_event(&event), vec![FileEvent::Removed(path)]);
    }

    #[test]
    fn rename_with_both_paths_moves_the_document() {
        let from = PathBuf::from("/data/draft.md");
        let to = PathBuf::from("/data/final.md");
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![from.clone(), to.clone()],
        );

        assert_eq!(
            convert_event(&event),
            vec![FileEvent::Removed(from), FileEvent::Changed(to)]
        );
    }

    #[test]
    fn access_is_dropped() {
        let event = make_event(
            EventKind::Access(AccessKind::Any),
            vec![PathBuf::from("/data/a.md")],
        );
        assert!(convert_event(&event).is_empty());
    }

    #[test]
    fn missing_root_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let result = FileWatcher::start(
            Path::new("/definitely/not/here"),
            WatchStrategy::default(),
            tx,
        );
        assert!(matches!(result, Err(WatchError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn relative_roots_are_watched_by_absolute_path() -> Result<(), Box<dyn std::error::Error>> {
        let (tx, _rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let watcher = tokio::task::spawn_blocking(move || {
            FileWatcher::start(Path::new("src"), WatchStrategy::default(), tx)
        })
        .await??;

        assert!(watcher.root().is_absolute());
        assert_eq!(watcher.root(), std::env::current_dir()?.join("src"));
        Ok(())
    }

    #[tokio::test]
    async fn polling_reports_new_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let root = dir.path().to_path_buf();
        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let watched_root = root.clone();
        let _watcher = tokio::task::spawn_blocking(move || {
            FileWatcher::start(
                &watched_root,
                WatchStrategy::Poll {
                    interval: Duration::from_millis(100),
                },
                tx,
            )
        })
        .await??;

        let path = root.join("fresh.md");
        std::fs::write(&path, "hello")?;

        let expected = FileEvent::Changed(path);
        let seen = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = rx.recv().await {
                if event == expected {
                    return true;
                }
            }
            false
        })
        .await?;

        assert!(seen);
        Ok(())
    }
}
