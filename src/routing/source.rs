//! Route source listing.
//!
//! The loader only needs names and a directory flag, so the tree it walks is
//! abstracted behind [`RouteSource`]: the real routes directory, or an
//! in-memory list of file paths for tests and embedded route sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub is_dir: bool,
}

impl SourceEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// A tree of route files.
pub trait RouteSource: Send + Sync {
    /// List `dir`, a `/`-separated path relative to the source root (`""` for the root).
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Routes directory on disk.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RouteSource for FsSource {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>> {
        let path = dir
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment));

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(dir = %path.display(), "Skipping entry with non UTF-8 name");
                continue;
            };
            let is_dir = entry.file_type()?.is_dir();
            entries.push(SourceEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory tree built from relative file paths such as `users/[id].rs`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeSet<String>,
}

impl MemorySource {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut source = Self::default();
        for file in files {
            source.add(file.as_ref());
        }
        source
    }

    pub fn add(&mut self, file: &str) {
        let file = file
            .replace('\\', "/")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if !file.is_empty() {
            self.files.insert(file);
        }
    }
}

impl RouteSource for MemorySource {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>> {
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut children: BTreeMap<&str, bool> = BTreeMap::new();
        for file in &self.files {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    children.insert(child, true);
                }
                None => {
                    children.entry(rest).or_insert(false);
                }
            }
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir),
            ));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| SourceEntry {
                name: name.to_string(),
                is_dir,
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!("memory ({} files)", self.files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_listing() {
        let source = MemorySource::new(["index.ts", "users/[id].ts", "users/index.ts", "docs/a/b.ts"]);
        assert_eq!(
            source.read_dir("").unwrap(),
            vec![SourceEntry::dir("docs"), SourceEntry::file("index.ts"), SourceEntry::dir("users")]
        );
        assert_eq!(
            source.read_dir("users").unwrap(),
            vec![SourceEntry::file("[id].ts"), SourceEntry::file("index.ts")]
        );
        assert_eq!(source.read_dir("docs/a").unwrap(), vec![SourceEntry::file("b.ts")]);
        assert!(source.read_dir("missing").is_err());
    }

    #[test]
    fn test_memory_normalizes_paths() {
        let mut source = MemorySource::new(["/api\\v1//users.ts"]);
        source.add("api/v1/posts.ts");
        assert_eq!(
            source.read_dir("api/v1").unwrap(),
            vec![SourceEntry::file("posts.ts"), SourceEntry::file("users.ts")]
        );
    }

    #[test]
    fn test_empty_memory_root_is_listable() {
        assert!(MemorySource::default().read_dir("").unwrap().is_empty());
    }
}
