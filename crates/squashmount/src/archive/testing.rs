//! In-memory decoder for overlay tests.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use super::decoder::{ContentReader, DecodeError, DecodeResult, DirNode, Lookup, NodeInfo};
use crate::vfs::FileType;

pub(crate) fn test_mtime() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// Shared counters and a failure switch for every node of one tree.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub fail: AtomicBool,
    pub lookups: AtomicUsize,
    pub opens: AtomicUsize,
}

impl Counters {
    fn check(&self) -> DecodeResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DecodeError::corrupt("injected failure"));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum MemNode {
    Dir(Arc<MemDir>),
    File { info: NodeInfo, data: Vec<u8> },
}

#[derive(Debug)]
pub(crate) struct MemDir {
    info: NodeInfo,
    children: BTreeMap<String, MemNode>,
    counters: Arc<Counters>,
}

impl DirNode for MemDir {
    fn info(&self) -> NodeInfo {
        self.info.clone()
    }

    fn lookup(&self, name: &str) -> DecodeResult<Lookup> {
        self.counters.check()?;
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(match self.children.get(name) {
            Some(MemNode::Dir(dir)) => Lookup::Dir(dir.clone()),
            Some(MemNode::File { info, .. }) => Lookup::File(info.clone()),
            None => Lookup::NotFound,
        })
    }

    fn read_dir(&self) -> DecodeResult<Vec<NodeInfo>> {
        self.counters.check()?;
        Ok(self
            .children
            .values()
            .map(|child| match child {
                MemNode::Dir(dir) => dir.info.clone(),
                MemNode::File { info, .. } => info.clone(),
            })
            .collect())
    }

    fn open(&self, name: &str) -> DecodeResult<ContentReader> {
        self.counters.check()?;
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        match self.children.get(name) {
            Some(MemNode::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(MemNode::Dir(_)) => Err(DecodeError::NotAFile(name.to_string())),
            None => Err(DecodeError::NotFound(name.to_string())),
        }
    }
}

/// Builder for an in-memory archive tree.
#[derive(Debug, Default)]
pub(crate) struct MemTree {
    dirs: BTreeMap<String, MemTree>,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        let (dir, name) = self.walk(path);
        dir.files.insert(name, data.to_vec());
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        let (dir, name) = self.walk(path);
        dir.dirs.entry(name).or_default();
        self
    }

    fn walk(&mut self, path: &str) -> (&mut MemTree, String) {
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let name = parts.pop().unwrap_or_default().to_string();
        let mut dir = self;
        for part in parts {
            dir = dir.dirs.entry(part.to_string()).or_default();
        }
        (dir, name)
    }

    pub fn build(self) -> (Arc<dyn DirNode>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let root: Arc<dyn DirNode> = self.into_node(String::new(), &counters);
        (root, counters)
    }

    fn into_node(self, name: String, counters: &Arc<Counters>) -> Arc<MemDir> {
        let mut children = BTreeMap::new();
        for (child, tree) in self.dirs {
            let node = tree.into_node(child.clone(), counters);
            children.insert(child, MemNode::Dir(node));
        }
        for (child, data) in self.files {
            let info = NodeInfo {
                name: child.clone(),
                kind: FileType::File,
                size: data.len() as u64,
                perm: 0o644,
                mtime: test_mtime(),
            };
            children.insert(child, MemNode::File { info, data });
        }
        Arc::new(MemDir {
            info: NodeInfo {
                name,
                kind: FileType::Directory,
                size: 0,
                perm: 0o755,
                mtime: test_mtime(),
            },
            children,
            counters: counters.clone(),
        })
    }
}
