//! Squashfs directories and file streams behind the decoder interface.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use squinter::squashfs::metadata::{EntryReference, Inode, InodeExtendedInfo};
use tracing::trace;

use super::{Image, with_image};
use crate::archive::path::join;
use crate::archive::{
    ContentReader, DecodeError, DecodeResult, DirNode, Lookup, NodeInfo, StreamSource,
};
use crate::vfs::FileType;

/// Bytes decoded per reopen of the image while streaming a file.
pub(super) const CHUNK: usize = 256 * 1024;

/// One directory of a squashfs image.
pub(super) struct SquashDir {
    source: StreamSource,
    /// `None` for the root directory.
    inode: Option<EntryReference>,
    path: String,
    info: NodeInfo,
}

impl SquashDir {
    pub(super) fn root(source: StreamSource, inode: &Inode) -> Self {
        Self {
            source,
            inode: None,
            path: String::new(),
            info: node_info(String::new(), inode),
        }
    }

    fn load(image: &mut Image, inode: Option<EntryReference>) -> io::Result<Inode> {
        match inode {
            Some(inode) => image.inode_from_entryref(inode),
            None => image.root_inode(),
        }
    }

    /// Every child with its inode, in listing order.
    fn children(&self) -> DecodeResult<Vec<(String, Inode)>> {
        let this = self.inode;
        with_image(&self.source, |image| {
            let dir = Self::load(image, this)?;
            let entries: Vec<_> = image
                .read_dir_inode(&dir)?
                .map(|entry| (entry.file_name(), entry.inode_ref()))
                .collect();
            entries
                .into_iter()
                .map(|(name, inode)| image.inode_from_entryref(inode).map(|i| (name, i)))
                .collect()
        })
    }

    /// The child called `name`, if any.
    fn child(&self, name: &str) -> DecodeResult<Option<(EntryReference, Inode)>> {
        let this = self.inode;
        with_image(&self.source, |image| {
            let dir = Self::load(image, this)?;
            let found = image
                .read_dir_inode(&dir)?
                .find(|entry| entry.file_name() == name)
                .map(|entry| entry.inode_ref());
            found
                .map(|inode| image.inode_from_entryref(inode).map(|i| (inode, i)))
                .transpose()
        })
    }
}

impl fmt::Debug for SquashDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SquashDir")
            .field("path", &self.path)
            .field("info", &self.info)
            .finish()
    }
}

impl DirNode for SquashDir {
    fn info(&self) -> NodeInfo {
        self.info.clone()
    }

    fn lookup(&self, name: &str) -> DecodeResult<Lookup> {
        trace!(dir = %self.path, name, "squashfs lookup");
        let Some((inode_ref, inode)) = self.child(name)? else {
            return Ok(Lookup::NotFound);
        };
        let info = node_info(name.to_string(), &inode);
        if !inode.is_dir() {
            return Ok(Lookup::File(info));
        }
        Ok(Lookup::Dir(Arc::new(SquashDir {
            source: Arc::clone(&self.source),
            inode: Some(inode_ref),
            path: join(&self.path, name),
            info,
        })))
    }

    fn read_dir(&self) -> DecodeResult<Vec<NodeInfo>> {
        Ok(self
            .children()?
            .into_iter()
            .map(|(name, inode)| node_info(name, &inode))
            .collect())
    }

    fn open(&self, name: &str) -> DecodeResult<ContentReader> {
        let path = join(&self.path, name);
        let Some((inode_ref, inode)) = self.child(name)? else {
            return Err(DecodeError::NotFound(path));
        };
        match &inode.extended_info {
            InodeExtendedInfo::BasicFile(file) => Ok(Box::new(FileStream {
                source: Arc::clone(&self.source),
                inode: inode_ref,
                size: u64::from(file.file_size),
                pos: 0,
                buf: Vec::new(),
                consumed: 0,
            })),
            InodeExtendedInfo::BasicSymlink(link) => {
                Ok(Box::new(Cursor::new(link.target_path.as_bytes().to_vec())))
            }
            _ if inode.is_dir() => Err(DecodeError::NotAFile(path)),
            _ if inode.is_file() => Err(DecodeError::Unsupported(format!(
                "extended file inode: {path}"
            ))),
            _ => Ok(Box::new(io::empty())),
        }
    }
}

fn node_info(name: String, inode: &Inode) -> NodeInfo {
    let (kind, size) = match &inode.extended_info {
        _ if inode.is_dir() => (FileType::Directory, 0),
        InodeExtendedInfo::BasicFile(file) => (FileType::File, u64::from(file.file_size)),
        InodeExtendedInfo::BasicSymlink(link) => {
            (FileType::Symlink, link.target_path.as_bytes().len() as u64)
        }
        _ => (FileType::File, 0),
    };
    NodeInfo {
        name,
        kind,
        size,
        perm: u32::from(inode.permissions()),
        mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(inode.mtime())),
    }
}

/// Forward-only stream over a regular file, decoded [`CHUNK`] bytes at a time.
struct FileStream {
    source: StreamSource,
    inode: EntryReference,
    size: u64,
    /// File offset of the end of `buf`.
    pos: u64,
    buf: Vec<u8>,
    consumed: usize,
}

impl FileStream {
    fn refill(&mut self) -> io::Result<()> {
        let (inode, pos) = (self.inode, self.pos);
        let want = (self.size - pos).min(CHUNK as u64);
        let chunk = with_image(&self.source, |image| {
            let inode = image.inode_from_entryref(inode)?;
            // open_file_inode only accepts basic file inodes.
            if !matches!(inode.extended_info, InodeExtendedInfo::BasicFile(_)) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "inode is not a regular file",
                ));
            }
            let mut reader = image.open_file_inode(&inode)?;
            reader.seek(SeekFrom::Start(pos))?;
            let mut chunk = Vec::with_capacity(want as usize);
            reader.take(want).read_to_end(&mut chunk)?;
            Ok(chunk)
        })?;
        if chunk.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file data ends at {pos} of {} bytes", self.size),
            ));
        }
        self.pos += chunk.len() as u64;
        self.buf = chunk;
        self.consumed = 0;
        Ok(())
    }
}

impl Read for FileStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.consumed == self.buf.len() {
            if self.pos >= self.size || out.is_empty() {
                return Ok(0);
            }
            self.refill()?;
        }
        let n = out.len().min(self.buf.len() - self.consumed);
        out[..n].copy_from_slice(&self.buf[self.consumed..self.consumed + n]);
        self.consumed += n;
        Ok(n)
    }
}
