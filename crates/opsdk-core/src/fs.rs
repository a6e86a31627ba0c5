//! Filesystem access for generators
//!
//! Everything that reads Go sources or manifests, or writes generated
//! artifacts, goes through the [`FileSystem`] trait so the same code runs
//! against the real disk or an in-memory tree in tests:
//! - `OsFileSystem`: real filesystem access
//! - `MemFileSystem`: in-memory files for testing
//!
//! Paths are used as given; callers resolve them against a project root.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use crate::error::{CoreError, Result};

/// Trait for file access providers
pub trait FileSystem: Send + Sync {
    /// Read the contents of a file as bytes
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a file, creating missing parent directories
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Check if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// List every regular file below `dir`, recursively, in sorted order
    fn walk_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Read the contents of a file as a string (UTF-8)
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| CoreError::InvalidUtf8(path.to_path_buf()))
    }
}

/// Real filesystem provider
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| CoreError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        tracing::debug!(path = %path.display(), "writing file");
        std::fs::write(path, contents).map_err(|e| CoreError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn walk_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Err(CoreError::NotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                CoreError::io(path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// In-memory file provider for testing
///
/// Directories are implicit: a path is a directory when some file lives
/// below it.
#[derive(Debug, Default)]
pub struct MemFileSystem {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemFileSystem {
    /// Create a new empty in-memory filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut files) = self.files.write() {
            files.insert(normalize(path.as_ref()), content.into());
        }
        self
    }

    /// Add a text file
    pub fn with_text_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        self.with_file(path, content.as_bytes().to_vec())
    }

    /// Add multiple text files at once
    pub fn with_files<'a>(mut self, files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (path, content) in files {
            self = self.with_text_file(path, content);
        }
        self
    }

    /// Snapshot of every stored path
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileSystem for MemFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.read().map_err(|_| CoreError::LockPoisoned)?;
        files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut files = self.files.write().map_err(|_| CoreError::LockPoisoned)?;
        files.insert(normalize(path), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let key = normalize(path);
        self.files
            .read()
            .map(|files| files.contains_key(&key) || is_dir_in(&files, &key))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let key = normalize(path);
        self.files
            .read()
            .map(|files| is_dir_in(&files, &key))
            .unwrap_or(false)
    }

    fn walk_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let key = normalize(dir);
        let files = self.files.read().map_err(|_| CoreError::LockPoisoned)?;
        if files.contains_key(&key) {
            return Ok(vec![key]);
        }
        let found: Vec<PathBuf> = files
            .keys()
            .filter(|p| key.as_os_str().is_empty() || (p.starts_with(&key) && **p != key))
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(CoreError::NotFound(dir.to_path_buf()));
        }
        Ok(found)
    }
}

fn is_dir_in(files: &BTreeMap<PathBuf, Vec<u8>>, dir: &Path) -> bool {
    if dir.as_os_str().is_empty() {
        return !files.is_empty();
    }
    files.keys().any(|p| p.starts_with(dir) && p != dir)
}

/// Drop `.` components so `./deploy/x.yaml` and `deploy/x.yaml` are one key
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
