use std::collections::BTreeSet;
use std::path::{Component, Path};

pub const HIDDEN_MARKER: char = '.';

pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".trash",
    ".stfolder",
    ".git",
    ".obsidian",
    "node_modules",
    "__pycache__",
];

#[derive(Debug, Clone)]
pub struct PathFilter {
    ignored: BTreeSet<String>,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl PathFilter {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ignored: BTreeSet<String> =
            DEFAULT_IGNORED_DIRS.iter().map(|name| name.to_string()).collect();
        ignored.extend(
            extra
                .into_iter()
                .map(Into::into)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        );
        Self { ignored }
    }

    pub fn is_ignored_name(&self, name: &str) -> bool {
        name.starts_with(HIDDEN_MARKER) || self.ignored.contains(name)
    }

    pub fn should_descend(&self, name: &str) -> bool {
        !self.is_ignored_name(name)
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(segment) => self.is_ignored_name(&segment.to_string_lossy()),
            _ => false,
        })
    }

    pub fn ignored_names(&self) -> impl Iterator<Item = &str> {
        self.ignored.iter().map(String::as_str)
    }
}
