//! Storage layer abstraction.
//!
//! The archive overlay reads its archive file through this layer and,
//! in turn, implements it, so overlays can be consumed anywhere a
//! storage is expected. Key components:
//!
//! - [`VfsOps`] - Core trait for read-side filesystem operations
//! - [`VfsHandle`] - `Read + Seek` over positional reads
//! - [`MemoryBackend`] - In-memory storage (for testing)
//! - [`LocalBackend`] - Local filesystem access (with path security)

pub mod backends;
mod error;
mod handle;
mod ops;
mod types;

pub use backends::{LocalBackend, MemoryBackend};
pub use error::{VfsError, VfsResult};
pub use handle::VfsHandle;
pub use ops::VfsOps;
pub use types::{DirEntry, FileAttr, FileType, Features, OpenFlags};
