//! # squashmount
//!
//! Read-only filesystem overlay over squashfs archives.
//!
//! An archive is read through a storage layer ([`VfsOps`]) and its tree
//! is exposed as a read-only namespace:
//! - Mounted under a path prefix, optionally rooted below the archive top
//! - Directories resolved lazily and cached for the overlay's lifetime
//! - File contents streamed with byte-range support
//! - Overlays are storage layers themselves, so archives nest

pub mod archive;
pub mod squashfs;
pub mod vfs;

pub use archive::{
    ArchiveError, ArchiveFs, ArchiveObject, ArchiveResult, ConfigError, Dir, HashType, ListEntry,
    MountConfig, Mounted, OpenOption, archivers, find_archiver,
};
pub use vfs::{
    DirEntry, FileAttr, FileType, LocalBackend, MemoryBackend, VfsError, VfsHandle, VfsOps,
    VfsResult,
};
