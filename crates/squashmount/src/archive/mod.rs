//! Read-only filesystem overlay over an archive file.
//!
//! [`ArchiveFs`] opens an archive stored in some [`VfsOps`] storage and
//! exposes its directory tree under a mount prefix:
//!
//! ```text
//! storage: images/rootfs.sqfs      overlay (prefix "rootfs"):
//!   ├── etc/hosts                    rootfs/etc/hosts
//!   └── bin/sh                       rootfs/bin/sh
//! ```
//!
//! The overlay can also be rooted below the top of the archive. Rooting
//! at a file yields [`Mounted::SingleObject`]: the overlay then lists the
//! file's parent directory and the caller treats it as one object.

pub mod config;
pub mod decoder;
pub mod dircache;
pub mod error;
pub mod object;
pub mod path;
pub mod range;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, MountConfig};
pub use decoder::{
    ContentReader, DecodeError, DecodeResult, DecoderFn, DirNode, Lookup, NodeInfo, ReadSeek,
    StreamSource,
};
pub use dircache::{DirCache, Resolved};
pub use error::{ArchiveError, ArchiveResult};
pub use object::{ArchiveObject, Dir, HashType, ListEntry, OpenOption};
pub use path::PathTranslator;
pub use range::RangeReader;
pub use registry::{Archiver, archivers, find_archiver};

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::vfs::{
    DirEntry, FileAttr, FileType, Features, OpenFlags, VfsError, VfsHandle, VfsOps, VfsResult,
};

/// Outcome of mounting an archive.
#[derive(Debug, Clone)]
pub enum Mounted {
    /// The root is a directory; the overlay is a traversable tree.
    Tree(ArchiveFs),
    /// The root named a file. The overlay is rooted at the file's parent
    /// and should be treated as wrapping that one file.
    SingleObject(ArchiveFs),
}

impl Mounted {
    /// The overlay, whichever way it was mounted.
    pub fn fs(&self) -> &ArchiveFs {
        match self {
            Mounted::Tree(fs) | Mounted::SingleObject(fs) => fs,
        }
    }

    /// Take the overlay, whichever way it was mounted.
    pub fn into_fs(self) -> ArchiveFs {
        match self {
            Mounted::Tree(fs) | Mounted::SingleObject(fs) => fs,
        }
    }

    /// Returns true if the root named a file.
    pub fn is_single_object(&self) -> bool {
        matches!(self, Mounted::SingleObject(_))
    }
}

/// Flat listing entry kept by [`ArchiveFs::build_index`].
#[derive(Debug, Clone, Copy)]
enum IndexEntry {
    Dir,
    File { size: u64, mod_time: SystemTime },
}

struct Inner {
    storage: Arc<dyn VfsOps>,
    name: String,
    remote: String,
    root: String,
    paths: PathTranslator,
    cache: DirCache,
    features: Features,
    index: RwLock<Option<HashMap<String, IndexEntry>>>,
    wrapper: RwLock<Option<Weak<dyn VfsOps>>>,
}

/// A read-only view of an archive's contents.
///
/// Cheap to clone; clones share the directory cache and listing index.
#[derive(Clone)]
pub struct ArchiveFs {
    inner: Arc<Inner>,
}

impl ArchiveFs {
    /// Mount the squashfs archive at `remote` in `storage`.
    pub fn new(
        storage: Arc<dyn VfsOps>,
        remote: &str,
        prefix: &str,
        root: &str,
    ) -> ArchiveResult<Mounted> {
        Self::with_decoder(storage, remote, prefix, root, crate::squashfs::decode)
    }

    /// Mount as described by `config`, picking the decoder by extension.
    ///
    /// Unknown extensions are decoded as squashfs.
    pub fn from_config(storage: Arc<dyn VfsOps>, config: &MountConfig) -> ArchiveResult<Mounted> {
        let decode = match find_archiver(&config.remote) {
            Some(archiver) => archiver.decode,
            None => {
                debug!(remote = %config.remote, "no archiver for extension, assuming squashfs");
                crate::squashfs::decode
            }
        };
        Self::with_decoder(storage, &config.remote, &config.prefix, &config.root, decode)
    }

    /// Mount the archive at `remote` in `storage`, parsed by `decode`.
    pub fn with_decoder(
        storage: Arc<dyn VfsOps>,
        remote: &str,
        prefix: &str,
        root: &str,
        decode: DecoderFn,
    ) -> ArchiveResult<Mounted> {
        let remote = remote.trim_matches('/');
        let archive_path = Path::new(remote);

        storage
            .getattr(archive_path)
            .map_err(|source| ArchiveError::ArchiveNotFound {
                remote: remote.to_string(),
                source,
            })?;
        VfsHandle::open(Arc::clone(&storage), archive_path, OpenFlags::read()).map_err(
            |source| ArchiveError::ArchiveOpenFailed {
                remote: remote.to_string(),
                source,
            },
        )?;
        let source = stream_source(Arc::clone(&storage), archive_path);
        let top = decode(source).map_err(|source| ArchiveError::ArchiveCorrupt {
            remote: remote.to_string(),
            source,
        })?;

        Self::mount_node(storage, remote, prefix, root, top)
    }

    /// Build the overlay around an already decoded archive.
    pub(crate) fn mount_node(
        storage: Arc<dyn VfsOps>,
        remote: &str,
        prefix: &str,
        root: &str,
        top: Arc<dyn DirNode>,
    ) -> ArchiveResult<Mounted> {
        let root = root.trim_matches('/');
        debug!(remote, prefix, root, "mounting archive");

        let mut cache = DirCache::new(top);
        let mut mount_root = root.to_string();
        let mut single_object = false;
        if !root.is_empty() {
            match cache.resolve(root)? {
                Resolved::Dir(dir) => cache = DirCache::new(dir),
                Resolved::IsFile => {
                    let (parent, _) = cache.find_parent(root)?;
                    cache = DirCache::new(parent);
                    mount_root = path::parent_of(root).to_string();
                    single_object = true;
                    debug!(remote, root, mount_root = %mount_root, "archive root is a file");
                }
                Resolved::NotFound => return Err(ArchiveError::directory_not_found(root)),
            }
        }

        let features = Features::default().mask(&storage.features());
        let fs = ArchiveFs {
            inner: Arc::new(Inner {
                name: path::join(&storage.name(), remote),
                storage,
                remote: remote.to_string(),
                root: mount_root,
                paths: PathTranslator::new(prefix),
                cache,
                features,
                index: RwLock::new(None),
                wrapper: RwLock::new(None),
            }),
        };
        Ok(if single_object {
            Mounted::SingleObject(fs)
        } else {
            Mounted::Tree(fs)
        })
    }

    /// Storage name joined with the archive path.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Archive-internal directory mounted as the namespace root.
    pub fn root(&self) -> &str {
        &self.inner.root
    }

    /// External mount prefix.
    pub fn prefix(&self) -> &str {
        self.inner.paths.prefix()
    }

    /// Path of the archive file in the wrapped storage.
    pub fn remote(&self) -> &str {
        &self.inner.remote
    }

    /// Capabilities of the overlay.
    pub fn features(&self) -> Features {
        self.inner.features
    }

    /// The storage the archive was read from.
    pub fn unwrap_fs(&self) -> &Arc<dyn VfsOps> {
        &self.inner.storage
    }

    /// Remember the layer that wraps this overlay. Only a weak reference
    /// is kept, since the wrapper usually owns the overlay.
    pub fn set_wrapper(&self, wrapper: &Arc<dyn VfsOps>) {
        *self.inner.wrapper.write() = Some(Arc::downgrade(wrapper));
    }

    /// The layer wrapping this overlay, while it is alive.
    pub fn wrap_fs(&self) -> Option<Arc<dyn VfsOps>> {
        self.inner.wrapper.read().as_ref().and_then(Weak::upgrade)
    }

    /// Granularity of modification times.
    pub fn precision(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Hash types the overlay can compute.
    pub fn hashes(&self) -> &'static [HashType] {
        &[]
    }

    /// List the immediate children of the external directory `dir`.
    pub fn list(&self, dir: &str) -> ArchiveResult<Vec<ListEntry>> {
        let internal = self.inner.paths.strip_prefix(dir)?;
        let node = match self.inner.cache.find_dir(&internal) {
            Ok(node) => node,
            Err(ArchiveError::IsAFile(_) | ArchiveError::DirectoryNotFound(_)) => {
                return Err(ArchiveError::directory_not_found(dir.trim_matches('/')));
            }
            Err(e) => return Err(e),
        };

        let children = node.read_dir()?;
        trace!(dir = %internal, count = children.len(), "listing directory");
        Ok(children
            .into_iter()
            .map(|child| {
                let remote = self.inner.paths.to_external(&internal, &child.name);
                self.entry(remote, &child)
            })
            .collect())
    }

    /// List everything below the external directory `dir`, depth first.
    pub fn list_recursive(&self, dir: &str) -> ArchiveResult<Vec<ListEntry>> {
        let mut out = Vec::new();
        let mut pending = vec![dir.to_string()];
        while let Some(dir) = pending.pop() {
            for entry in self.list(&dir)? {
                if entry.is_dir() {
                    pending.push(entry.remote().to_string());
                }
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Walk the whole namespace once and remember every entry, enabling
    /// [`new_object`](Self::new_object). Returns the number of entries.
    pub fn build_index(&self) -> ArchiveResult<usize> {
        let entries = self.list_recursive(self.prefix())?;
        let index: HashMap<String, IndexEntry> = entries
            .into_iter()
            .map(|entry| {
                let value = match &entry {
                    ListEntry::Dir(_) => IndexEntry::Dir,
                    ListEntry::Object(obj) => IndexEntry::File {
                        size: obj.size(),
                        mod_time: obj.mod_time(),
                    },
                };
                (entry.remote().to_string(), value)
            })
            .collect();
        let count = index.len();
        debug!(name = %self.inner.name, count, "built listing index");
        *self.inner.index.write() = Some(index);
        Ok(count)
    }

    /// Look up a file by external path in the listing index.
    pub fn new_object(&self, remote: &str) -> ArchiveResult<ArchiveObject> {
        let remote = remote.trim_matches('/');
        let index = self.inner.index.read();
        match index.as_ref().and_then(|index| index.get(remote)) {
            Some(IndexEntry::File { size, mod_time }) => Ok(ArchiveObject::new(
                self.clone(),
                remote.to_string(),
                *size,
                *mod_time,
            )),
            Some(IndexEntry::Dir) => Err(ArchiveError::NotAFile(remote.to_string())),
            None => Err(ArchiveError::ObjectNotFound(remote.to_string())),
        }
    }

    /// Metadata of one external path, file or directory.
    pub fn stat(&self, remote: &str) -> ArchiveResult<ListEntry> {
        let internal = self.inner.paths.strip_prefix(remote)?;
        let remote = remote.trim_matches('/').to_string();
        if internal.is_empty() {
            let info = self.inner.cache.root().info();
            return Ok(ListEntry::Dir(Dir::new(remote, info.mtime)));
        }

        let (parent, leaf) = self.inner.cache.find_parent(&internal)?;
        match parent.lookup(&leaf)? {
            Lookup::Dir(dir) => Ok(self.entry(remote, &dir.info())),
            Lookup::File(info) => Ok(self.entry(remote, &info)),
            Lookup::NotFound => Err(ArchiveError::ObjectNotFound(remote)),
        }
    }

    /// Open the file at external path `remote`, skipping `offset` bytes
    /// and stopping at absolute position `limit` if given.
    ///
    /// Every call opens a fresh decoder stream.
    pub fn open(
        &self,
        remote: &str,
        offset: u64,
        limit: Option<u64>,
    ) -> ArchiveResult<RangeReader<ContentReader>> {
        let internal = self.inner.paths.strip_prefix(remote)?;
        let (parent, leaf) = self.inner.cache.find_parent(&internal)?;
        let stream = parent.open(&leaf)?;
        Ok(RangeReader::new(stream, offset, limit)?)
    }

    /// Archives are read-only.
    pub fn mkdir(&self, _dir: &str) -> ArchiveResult<()> {
        Err(ArchiveError::ReadOnly)
    }

    /// Archives are read-only.
    pub fn rmdir(&self, _dir: &str) -> ArchiveResult<()> {
        Err(ArchiveError::ReadOnly)
    }

    /// Archives are read-only.
    pub fn put(
        &self,
        _src: &mut dyn Read,
        _remote: &str,
        _size: u64,
        _mod_time: SystemTime,
    ) -> ArchiveResult<ArchiveObject> {
        Err(ArchiveError::ReadOnly)
    }

    fn entry(&self, remote: String, info: &NodeInfo) -> ListEntry {
        if info.is_dir() {
            ListEntry::Dir(Dir::new(remote, info.mtime))
        } else {
            ListEntry::Object(ArchiveObject::new(self.clone(), remote, info.size, info.mtime))
        }
    }
}

impl fmt::Debug for ArchiveFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFs")
            .field("name", &self.inner.name)
            .field("prefix", &self.inner.paths.prefix())
            .field("root", &self.inner.root)
            .field("cache", &self.inner.cache)
            .finish()
    }
}

impl fmt::Display for ArchiveFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Squashfs \"{}\"", self.inner.name)
    }
}

/// Read buffer in front of each archive stream.
const STREAM_BUFFER: usize = 64 * 1024;

/// Reopens `path` in `storage` for every stream a decoder asks for.
fn stream_source(storage: Arc<dyn VfsOps>, path: &Path) -> StreamSource {
    let path = path.to_path_buf();
    Arc::new(move || {
        let handle = VfsHandle::open(Arc::clone(&storage), &path, OpenFlags::read())?;
        let stream: Box<dyn ReadSeek> = Box::new(BufReader::with_capacity(STREAM_BUFFER, handle));
        Ok(stream)
    })
}

fn path_str(path: &Path) -> VfsResult<&str> {
    path.to_str()
        .ok_or_else(|| VfsError::invalid_path(path.display().to_string()))
}

/// Lets an overlay serve as the storage of another overlay.
impl VfsOps for ArchiveFs {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        Ok(match self.stat(path_str(path)?)? {
            ListEntry::Dir(dir) => FileAttr::directory(0o555, dir.mod_time()),
            ListEntry::Object(obj) => FileAttr::file(obj.size(), 0o444, obj.mod_time()),
        })
    }

    fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let entries = self.list(path_str(path)?)?;
        Ok(entries
            .iter()
            .map(|entry| {
                let kind = if entry.is_dir() {
                    FileType::Directory
                } else {
                    FileType::File
                };
                DirEntry::new(entry.name(), kind)
            })
            .collect())
    }

    fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let limit = offset.saturating_add(size as u64);
        let mut reader = match self.open(path_str(path)?, offset, Some(limit)) {
            Ok(reader) => reader,
            Err(ArchiveError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(size as usize);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    fn read_only(&self) -> bool {
        true
    }

    fn features(&self) -> Features {
        self.inner.features
    }
}
