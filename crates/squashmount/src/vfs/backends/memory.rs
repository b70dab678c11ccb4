//! In-memory storage backend.
//!
//! Used for testing and for archives that are already held in memory.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, FileType};

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, attr: FileAttr },
    Directory { attr: FileAttr },
}

impl Entry {
    fn attr(&self) -> &FileAttr {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
        }
    }
}

/// In-memory storage backend.
///
/// Entries live behind one `RwLock`; everything is lost on drop.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::from(""),
            Entry::Directory {
                attr: FileAttr::directory(0o755, SystemTime::now()),
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Store `data` at `path`, creating parent directories as needed.
    ///
    /// Replaces any existing file at that path.
    pub fn insert_file(&self, path: impl AsRef<Path>, data: Vec<u8>) {
        let normalized = Self::normalize(path.as_ref());
        let attr = FileAttr::file(data.len() as u64, 0o644, SystemTime::now());
        let mut entries = self.entries.write();
        Self::ensure_parents(&mut entries, &normalized);
        entries.insert(normalized, Entry::File { data, attr });
    }

    /// Create the directory at `path` and its parents.
    pub fn insert_dir(&self, path: impl AsRef<Path>) {
        let normalized = Self::normalize(path.as_ref());
        let mut entries = self.entries.write();
        Self::ensure_parents(&mut entries, &normalized);
        entries.entry(normalized).or_insert(Entry::Directory {
            attr: FileAttr::directory(0o755, SystemTime::now()),
        });
    }

    /// Normalize a path (remove leading /, resolve . and ..).
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
            }
        }
        result
    }

    /// Ensure all parent directories exist.
    fn ensure_parents(entries: &mut HashMap<PathBuf, Entry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                entries.entry(current.clone()).or_insert(Entry::Directory {
                    attr: FileAttr::directory(0o755, SystemTime::now()),
                });
            }
        }
    }

    /// Get the path string for error messages.
    fn path_str(path: &Path) -> String {
        path.display().to_string()
    }
}

impl VfsOps for MemoryBackend {
    fn name(&self) -> String {
        "memory".to_string()
    }

    fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let normalized = Self::normalize(path);
        let entries = self.entries.read();

        entries
            .get(&normalized)
            .map(|e| e.attr().clone())
            .ok_or_else(|| VfsError::not_found(Self::path_str(&normalized)))
    }

    fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let normalized = Self::normalize(path);
        let entries = self.entries.read();

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(Self::path_str(&normalized))),
            None => return Err(VfsError::not_found(Self::path_str(&normalized))),
        }

        let mut result = Vec::new();
        for (entry_path, entry) in entries.iter() {
            if entry_path.parent() != Some(normalized.as_path()) {
                continue;
            }
            if let Some(name) = entry_path.file_name() {
                let kind = match entry {
                    Entry::File { .. } => FileType::File,
                    Entry::Directory { .. } => FileType::Directory,
                };
                result.push(DirEntry {
                    name: name.to_string_lossy().into_owned(),
                    kind,
                });
            }
        }

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let normalized = Self::normalize(path);
        let entries = self.entries.read();

        match entries.get(&normalized) {
            Some(Entry::File { data, .. }) => {
                let start = (offset.min(data.len() as u64)) as usize;
                let end = (start + size as usize).min(data.len());
                Ok(data[start..end].to_vec())
            }
            Some(Entry::Directory { .. }) => {
                Err(VfsError::is_a_directory(Self::path_str(&normalized)))
            }
            None => Err(VfsError::not_found(Self::path_str(&normalized))),
        }
    }

    fn read_only(&self) -> bool {
        false
    }
}
