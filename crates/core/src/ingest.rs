use crate::filter::PathFilter;
use crate::models::DocumentType;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct Discovery {
    pub candidates: Vec<PathBuf>,
    pub ignored: usize,
    pub unreadable: usize,
}

/// Document ids hash the path text, so every path must be spelled from `/`.
/// `.` and `..` segments are resolved lexically; symlinks are kept as given.
pub fn absolute_root(root: &Path) -> std::io::Result<PathBuf> {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

pub fn discover_indexable_files(root: &Path, filter: &PathFilter) -> Discovery {
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || filter.should_descend(&entry.file_name().to_string_lossy())
    });

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(error = %error, "unreadable directory entry");
                discovery.unreadable += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() || DocumentType::from_path(entry.path()).is_none() {
            continue;
        }

        if filter.should_ignore(entry.path()) {
            discovery.ignored += 1;
            continue;
        }

        discovery.candidates.push(entry.into_path());
    }

    discovery
}
