//! Files and directories as listed by the overlay.

use std::fmt;
use std::io::Read;
use std::time::SystemTime;

use tracing::warn;

use super::ArchiveFs;
use super::decoder::ContentReader;
use super::error::{ArchiveError, ArchiveResult};
use super::range::RangeReader;

/// Checksum algorithms a storage layer may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Md5,
}

/// How much of an object to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOption {
    /// Start reading at this offset.
    Seek(u64),
    /// HTTP-style inclusive byte range. With only `end` set, the last
    /// `end` bytes are returned.
    Range {
        start: Option<u64>,
        end: Option<u64>,
    },
}

impl OpenOption {
    /// Convert to `(offset, limit)` where `limit` is the exclusive end
    /// position, `None` meaning "to the end".
    pub fn decode(&self, size: u64) -> (u64, Option<u64>) {
        match *self {
            OpenOption::Seek(offset) => (offset, None),
            OpenOption::Range {
                start: Some(start),
                end,
            } => (start, end.map(|end| end.saturating_add(1))),
            OpenOption::Range {
                start: None,
                end: Some(suffix),
            } => (size.saturating_sub(suffix), None),
            OpenOption::Range {
                start: None,
                end: None,
            } => (0, None),
        }
    }
}

/// A directory entry produced by listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    remote: String,
    mod_time: SystemTime,
}

impl Dir {
    pub(crate) fn new(remote: String, mod_time: SystemTime) -> Self {
        Self { remote, mod_time }
    }

    /// External path of the directory.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Modification time of the directory.
    pub fn mod_time(&self) -> SystemTime {
        self.mod_time
    }
}

/// One file inside the archive.
///
/// A plain value: reads go back through the overlay, which re-resolves
/// the parent directory and opens a fresh decoder stream every time.
#[derive(Clone)]
pub struct ArchiveObject {
    fs: ArchiveFs,
    remote: String,
    size: u64,
    mod_time: SystemTime,
}

impl ArchiveObject {
    pub(crate) fn new(fs: ArchiveFs, remote: String, size: u64, mod_time: SystemTime) -> Self {
        Self {
            fs,
            remote,
            size,
            mod_time,
        }
    }

    /// The overlay this object belongs to.
    pub fn fs(&self) -> &ArchiveFs {
        &self.fs
    }

    /// External path of the object.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time recorded in the archive.
    pub fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    /// Objects can always be stored elsewhere.
    pub fn storable(&self) -> bool {
        true
    }

    /// Archives carry no checksums.
    pub fn hash(&self, _ty: HashType) -> ArchiveResult<String> {
        Err(ArchiveError::HashUnsupported)
    }

    /// Open the object for reading. Later options override earlier ones.
    pub fn open(&self, options: &[OpenOption]) -> ArchiveResult<RangeReader<ContentReader>> {
        let (offset, limit) = options
            .iter()
            .fold((0, None), |_, option| option.decode(self.size));
        if offset > self.size {
            warn!(
                remote = %self.remote,
                offset,
                size = self.size,
                "range starts past end of object"
            );
        }
        self.fs.open(&self.remote, offset, limit)
    }

    /// Read the whole object into memory.
    pub fn read_all(&self) -> ArchiveResult<Vec<u8>> {
        let mut data = Vec::with_capacity(self.size as usize);
        self.open(&[])?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Archives are read-only.
    pub fn set_mod_time(&self, _mod_time: SystemTime) -> ArchiveResult<()> {
        Err(ArchiveError::ReadOnly)
    }

    /// Archives are read-only.
    pub fn update(
        &self,
        _src: &mut dyn Read,
        _size: u64,
        _mod_time: SystemTime,
    ) -> ArchiveResult<()> {
        Err(ArchiveError::ReadOnly)
    }

    /// Archives are read-only.
    pub fn remove(&self) -> ArchiveResult<()> {
        Err(ArchiveError::ReadOnly)
    }
}

impl PartialEq for ArchiveObject {
    fn eq(&self, other: &Self) -> bool {
        self.remote == other.remote
    }
}

impl Eq for ArchiveObject {}

impl fmt::Debug for ArchiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveObject")
            .field("remote", &self.remote)
            .field("size", &self.size)
            .field("mod_time", &self.mod_time)
            .finish()
    }
}

impl fmt::Display for ArchiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.remote)
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Dir(Dir),
    Object(ArchiveObject),
}

impl ListEntry {
    /// External path of the entry.
    pub fn remote(&self) -> &str {
        match self {
            ListEntry::Dir(dir) => dir.remote(),
            ListEntry::Object(obj) => obj.remote(),
        }
    }

    /// Last path segment of the entry.
    pub fn name(&self) -> &str {
        let remote = self.remote();
        remote.rsplit('/').next().unwrap_or(remote)
    }

    /// Modification time of the entry.
    pub fn mod_time(&self) -> SystemTime {
        match self {
            ListEntry::Dir(dir) => dir.mod_time(),
            ListEntry::Object(obj) => obj.mod_time(),
        }
    }

    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, ListEntry::Dir(_))
    }

    /// The object, if this entry is a file.
    pub fn as_object(&self) -> Option<&ArchiveObject> {
        match self {
            ListEntry::Object(obj) => Some(obj),
            ListEntry::Dir(_) => None,
        }
    }
}
