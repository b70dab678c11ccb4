//! Core storage types.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Attributes for a regular file.
    pub fn file(size: u64, perm: u32, mtime: SystemTime) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime,
        }
    }

    /// Attributes for a directory.
    pub fn directory(perm: u32, mtime: SystemTime) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
            mtime,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Open file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Write access (also enables read).
    pub fn write() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

/// Optional capabilities of a storage layer.
///
/// A layer wrapping another must never claim a capability the wrapped
/// layer lacks; see [`Features::mask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Names compare case-insensitively.
    pub case_insensitive: bool,
    /// Two entries may share a name.
    pub duplicate_files: bool,
    /// MIME types can be read back.
    pub read_mime_type: bool,
    /// MIME types can be stored.
    pub write_mime_type: bool,
    /// Directories only exist implicitly through their contents.
    pub bucket_based: bool,
    /// Empty directories can be represented.
    pub can_have_empty_directories: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            duplicate_files: false,
            read_mime_type: false,
            write_mime_type: false,
            bucket_based: false,
            can_have_empty_directories: true,
        }
    }
}

impl Features {
    /// Keep only the capabilities that `other` also has.
    pub fn mask(self, other: &Features) -> Self {
        Self {
            case_insensitive: self.case_insensitive && other.case_insensitive,
            duplicate_files: self.duplicate_files && other.duplicate_files,
            read_mime_type: self.read_mime_type && other.read_mime_type,
            write_mime_type: self.write_mime_type && other.write_mime_type,
            bucket_based: self.bucket_based && other.bucket_based,
            can_have_empty_directories: self.can_have_empty_directories
                && other.can_have_empty_directories,
        }
    }
}
