//! File access used by the program loader.
//!
//! The analyzer never touches `std::fs` directly so the whole pipeline can
//! run against in-memory sources.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ExportMapError, Result};

/// Source of files for a [`Program`](super::Program)
pub trait SourceHost: Send {
    /// Whether a regular file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read a file as UTF-8
    fn read(&self, path: &Path) -> Result<String>;

    /// All files below `dir`, recursively, in a stable order
    fn list(&self, dir: &Path) -> Vec<PathBuf>;
}

/// Host backed by the real file system
#[derive(Debug, Default, Clone)]
pub struct DiskHost;

impl SourceHost for DiskHost {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn list(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "node_modules")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| normalize_path(entry.path()))
            .collect()
    }
}

/// Host serving sources from memory, keyed by normalized path
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>, S: Into<String>>(&mut self, path: P, content: S) {
        self.files.insert(normalize_path(path.as_ref()), content.into());
    }

    pub fn with_file<P: AsRef<Path>, S: Into<String>>(mut self, path: P, content: S) -> Self {
        self.insert(path, content);
        self
    }
}

impl SourceHost for MemoryHost {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| {
                ExportMapError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            })
    }

    fn list(&self, dir: &Path) -> Vec<PathBuf> {
        let dir = normalize_path(dir);
        self.files
            .keys()
            .filter(|path| path.starts_with(&dir))
            .cloned()
            .collect()
    }
}

/// Lexically resolve `.` and `..` components without touching the disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
