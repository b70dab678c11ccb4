//! Squashfs archives, read through the `squinter` crate.
//!
//! `squinter` handles are single-threaded, so nodes hold inode references
//! only and open the image again for every operation. Listings and inodes
//! live in small metadata blocks, so reopening costs a superblock read and
//! a few block decompressions.
//!
//! Supported block compressors are gzip, xz and zstd. Extended file and
//! symlink inodes (hard-linked or sparse files, symlinks with xattrs) are
//! listed but cannot be read.

mod node;

#[cfg(test)]
pub(crate) mod testing;

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use squinter::squashfs::SquashFS;
use tracing::debug;

use crate::archive::{DecodeError, DecodeResult, DirNode, ReadSeek, StreamSource};
use node::SquashDir;

type Image = SquashFS<Box<dyn ReadSeek>>;

/// Parse a squashfs image and return its root directory.
pub fn decode(source: StreamSource) -> DecodeResult<Arc<dyn DirNode>> {
    let root = with_image(&source, |image| image.root_inode())?;
    if !root.is_dir() {
        return Err(DecodeError::corrupt("root inode is not a directory"));
    }
    debug!(
        inode = root.inode_number(),
        mtime = root.mtime(),
        "opened squashfs image"
    );
    Ok(Arc::new(SquashDir::root(source, &root)))
}

/// Open the image from `source` and run `f` on it.
///
/// Panics inside the parser are reported as corruption.
fn with_image<T>(
    source: &StreamSource,
    f: impl FnOnce(&mut Image) -> io::Result<T>,
) -> DecodeResult<T> {
    let stream = source()?;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut image = SquashFS::new(stream)?;
        f(&mut image)
    }));
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(decode_error(e)),
        Err(_) => Err(DecodeError::corrupt("squashfs parser panicked")),
    }
}

fn decode_error(e: io::Error) -> DecodeError {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            DecodeError::Corrupt(e.to_string())
        }
        io::ErrorKind::Unsupported => DecodeError::Unsupported(e.to_string()),
        _ => DecodeError::Io(e),
    }
}
