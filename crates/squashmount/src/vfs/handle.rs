//! Seekable read handle over a storage layer.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ops::VfsOps;
use super::types::OpenFlags;
use super::{VfsError, VfsResult};

/// A `Read + Seek` adapter that reads a storage file with positional reads.
///
/// The handle does not hold any state in the storage layer: each `read`
/// is an independent `VfsOps::read` at the handle's own offset, so any
/// number of handles can share one storage.
pub struct VfsHandle {
    storage: Arc<dyn VfsOps>,
    path: PathBuf,
    size: u64,
    offset: u64,
}

impl fmt::Debug for VfsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfsHandle")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .finish()
    }
}

impl VfsHandle {
    /// Open `path` on `storage`.
    ///
    /// Handles are read-only: asking for write access fails with
    /// [`VfsError::ReadOnly`].
    pub fn open(storage: Arc<dyn VfsOps>, path: &Path, flags: OpenFlags) -> VfsResult<Self> {
        if flags.write {
            return Err(VfsError::ReadOnly);
        }
        let attr = storage.getattr(path)?;
        if attr.is_dir() {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        Ok(Self {
            storage,
            path: path.to_path_buf(),
            size: attr.size,
            offset: 0,
        })
    }

    /// Size of the file when it was opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path this handle reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for VfsHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.offset >= self.size {
            return Ok(0);
        }
        let want = buf.len().min(u32::MAX as usize) as u32;
        let data = self.storage.read(&self.path, self.offset, want)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.offset += n as u64;
        Ok(n)
    }
}

impl Seek for VfsHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.offset.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.offset = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryBackend;

    fn storage_with(data: &[u8]) -> Arc<dyn VfsOps> {
        let mem = MemoryBackend::new();
        mem.insert_file("blob.bin", data.to_vec());
        Arc::new(mem)
    }

    fn open_blob(data: &[u8]) -> VfsHandle {
        VfsHandle::open(storage_with(data), Path::new("blob.bin"), OpenFlags::read()).unwrap()
    }

    #[test]
    fn test_read_complete_file() {
        let mut handle = open_blob(b"Hello, world!");

        let mut buf = Vec::new();
        handle.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"Hello, world!");
        assert_eq!(handle.size(), 13);
    }

    #[test]
    fn test_seek_then_read() {
        let mut handle = open_blob(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ");

        handle.seek(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 3];
        handle.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"KLM");

        handle.seek(SeekFrom::End(-2)).unwrap();
        let mut rest = Vec::new();
        handle.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"YZ");

        handle.seek(SeekFrom::Current(-4)).unwrap();
        handle.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"WXY");
    }

    #[test]
    fn test_read_past_eof_returns_zero() {
        let mut handle = open_blob(b"Short");

        handle.seek(SeekFrom::Start(100)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_negative_seek_fails() {
        let mut handle = open_blob(b"abc");
        assert!(handle.seek(SeekFrom::Current(-1)).is_err());
    }

    #[test]
    fn test_open_rejects_write_and_directories() {
        let mem = MemoryBackend::new();
        mem.insert_dir("dir");
        let storage: Arc<dyn VfsOps> = Arc::new(mem);

        let dir = Path::new("dir");
        let err = VfsHandle::open(storage.clone(), dir, OpenFlags::read()).unwrap_err();
        assert!(matches!(err, VfsError::IsADirectory(_)));

        let err = VfsHandle::open(storage.clone(), dir, OpenFlags::write()).unwrap_err();
        assert!(matches!(err, VfsError::ReadOnly));

        let err = VfsHandle::open(storage, Path::new("missing"), OpenFlags::read()).unwrap_err();
        assert!(err.is_not_found());
    }
}
