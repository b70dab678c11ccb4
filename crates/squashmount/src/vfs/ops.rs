//! Storage operations trait.
//!
//! The read side of a path-based filesystem: enough to stat, list and
//! read an archive file and, for the archive overlay itself, to be
//! consumed as a storage layer in turn.

use std::path::Path;

use super::types::{DirEntry, FileAttr, Features};
use super::VfsResult;

/// Core storage operations trait.
///
/// All operations are path-based and blocking. Paths are relative to
/// the backend's root; a leading `/` is ignored.
pub trait VfsOps: Send + Sync {
    /// Human readable name of this storage (used to name overlays).
    fn name(&self) -> String;

    /// Get file attributes.
    fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries.
    ///
    /// Returns all entries in the directory (no pagination).
    fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`.
    /// Returns fewer bytes if EOF is reached.
    fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Optional capabilities of this storage.
    fn features(&self) -> Features {
        Features::default()
    }

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool {
        self.getattr(path).is_ok()
    }

    /// Read entire file contents.
    fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path)?;
        let mut data = Vec::with_capacity(attr.size as usize);
        while (data.len() as u64) < attr.size {
            let want = (attr.size - data.len() as u64).min(u32::MAX as u64) as u32;
            let chunk = self.read(path, data.len() as u64, want)?;
            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}
