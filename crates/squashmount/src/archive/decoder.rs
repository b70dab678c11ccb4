//! Interface between the overlay and an archive decoder.
//!
//! A decoder turns a seekable byte stream into a tree of [`DirNode`]s.
//! Nodes are immutable and shared; the overlay caches them by path.

use std::fmt;
use std::io::{self, Read, Seek};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

use crate::vfs::FileType;

/// Byte stream an archive is decoded from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Sequential stream of one archive member's content.
pub type ContentReader = Box<dyn Read + Send>;

/// Opens a fresh stream over the archive bytes, positioned at the start.
pub type StreamSource = Arc<dyn Fn() -> io::Result<Box<dyn ReadSeek>> + Send + Sync>;

/// Parses an archive and returns its root directory. Decoders may call
/// `source` again whenever they need a new stream.
pub type DecoderFn = fn(StreamSource) -> DecodeResult<Arc<dyn DirNode>>;

/// Error reported by an archive decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The archive uses a feature this decoder lacks, such as an
    /// unknown compressor.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Structural damage inside the archive.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    /// No member with this name.
    #[error("not found: {0}")]
    NotFound(String),

    /// The member exists but has no readable content of its own.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// I/O error while reading the archive stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Create a Corrupt error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

impl From<DecodeError> for io::Error {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Io(e) => e,
            DecodeError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            DecodeError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Decoder result type.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Metadata of one directory member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Member name (no separators).
    pub name: String,
    /// Member type.
    pub kind: FileType,
    /// Content length in bytes; zero for directories.
    pub size: u64,
    /// Unix permission bits.
    pub perm: u32,
    /// Modification time.
    pub mtime: SystemTime,
}

impl NodeInfo {
    /// Returns true if this member is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Result of resolving one name inside a directory.
pub enum Lookup {
    /// The name is a directory.
    Dir(Arc<dyn DirNode>),
    /// The name is a file (or any other non-directory member).
    File(NodeInfo),
    /// Nothing by that name.
    NotFound,
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
            Lookup::File(info) => f.debug_tuple("File").field(info).finish(),
            Lookup::NotFound => f.write_str("NotFound"),
        }
    }
}

/// One directory inside an archive.
pub trait DirNode: Send + Sync + fmt::Debug {
    /// Metadata of this directory itself.
    fn info(&self) -> NodeInfo;

    /// Resolve an immediate child by name.
    fn lookup(&self, name: &str) -> DecodeResult<Lookup>;

    /// List immediate children in decoder order.
    fn read_dir(&self) -> DecodeResult<Vec<NodeInfo>>;

    /// Open an immediate child's content as a forward-only stream.
    fn open(&self, name: &str) -> DecodeResult<ContentReader>;
}
