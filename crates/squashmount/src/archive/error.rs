//! Overlay error types.

use std::io;
use thiserror::Error;

use super::decoder::DecodeError;
use crate::vfs::VfsError;

/// Error returned by archive overlay operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file does not exist in the wrapped storage.
    #[error("failed to find {remote:?} archive: {source}")]
    ArchiveNotFound {
        remote: String,
        #[source]
        source: VfsError,
    },

    /// The wrapped storage refused to open the archive file.
    #[error("failed to open archive {remote:?}: {source}")]
    ArchiveOpenFailed {
        remote: String,
        #[source]
        source: VfsError,
    },

    /// The decoder could not parse the archive.
    #[error("archive {remote:?} is corrupt or unsupported: {source}")]
    ArchiveCorrupt {
        remote: String,
        #[source]
        source: DecodeError,
    },

    /// A path segment is not an existing directory.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// A path names a file where a directory was expected.
    #[error("is a file not a directory: {0}")]
    IsAFile(String),

    /// No object at this path in the listing index.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The path names a directory where an object was expected.
    #[error("is not a regular file: {0}")]
    NotAFile(String),

    /// Mutating operation on the read-only archive.
    #[error("read-only file system")]
    ReadOnly,

    /// Hash requested; archives carry none.
    #[error("hash type not supported")]
    HashUnsupported,

    /// A caller broke an internal contract.
    #[error("internal error: {0}")]
    Internal(String),

    /// Decoder failure while reading a member.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// I/O error while streaming content.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Create a DirectoryNotFound error.
    pub fn directory_not_found(path: impl Into<String>) -> Self {
        Self::DirectoryNotFound(path.into())
    }

    /// Create an IsAFile error.
    pub fn is_a_file(path: impl Into<String>) -> Self {
        Self::IsAFile(path.into())
    }

    /// Create an Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Map overlay errors onto the storage error space, so an overlay can
/// stand in for a storage layer.
impl From<ArchiveError> for VfsError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::DirectoryNotFound(msg) | ArchiveError::ObjectNotFound(msg) => {
                VfsError::NotFound(msg)
            }
            ArchiveError::IsAFile(msg) => VfsError::NotADirectory(msg),
            ArchiveError::NotAFile(msg) => VfsError::IsADirectory(msg),
            ArchiveError::ReadOnly => VfsError::ReadOnly,
            ArchiveError::Decode(DecodeError::NotFound(msg)) => VfsError::NotFound(msg),
            ArchiveError::Decode(DecodeError::Io(e)) | ArchiveError::Io(e) => VfsError::Io(e),
            ArchiveError::ArchiveNotFound { source, .. }
            | ArchiveError::ArchiveOpenFailed { source, .. } => source,
            other => VfsError::Other(other.to_string()),
        }
    }
}

/// Overlay result type.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
