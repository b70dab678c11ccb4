//! Local filesystem backend.
//!
//! Provides read-only access to real filesystem paths, with path
//! security to prevent escaping the root directory.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, FileType};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/srv/images`, then `read("base/rootfs.sqfs")` reads
/// `/srv/images/base/rootfs.sqfs`.
///
/// Path security is enforced: attempts to escape via `..` or symlinks
/// pointing outside the root are blocked.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Returns an error if the path does not exist or escapes the root.
    fn resolve(&self, path: &Path) -> VfsResult<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);

        if path.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(path);
        let canonical = dunce::canonicalize(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VfsError::not_found(path.display().to_string())
            } else {
                VfsError::from(e)
            }
        })?;

        if !canonical.starts_with(&self.root) {
            return Err(VfsError::path_escapes_root(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }

        Ok(canonical)
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &fs::Metadata) -> FileAttr {
        let kind = if meta.is_dir() {
            FileType::Directory
        } else if meta.file_type().is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        FileAttr {
            size: if meta.is_dir() { 0 } else { meta.len() },
            kind,
            perm: Self::perm(meta),
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        }
    }

    #[cfg(unix)]
    fn perm(meta: &fs::Metadata) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    }

    #[cfg(not(unix))]
    fn perm(meta: &fs::Metadata) -> u32 {
        if meta.permissions().readonly() { 0o444 } else { 0o644 }
    }
}

impl VfsOps for LocalBackend {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)?;
        Ok(Self::metadata_to_attr(&meta))
    }

    fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let full_path = self.resolve(path)?;
        if !full_path.is_dir() {
            return Err(VfsError::not_a_directory(path.display().to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full_path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_dir() {
                FileType::Directory
            } else if file_type.is_symlink() {
                FileType::Symlink
            } else {
                FileType::File
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let full_path = self.resolve(path)?;
        if full_path.is_dir() {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }

        let mut file = fs::File::open(&full_path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = Vec::with_capacity(size as usize);
        file.take(size as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn read_only(&self) -> bool {
        true
    }
}
