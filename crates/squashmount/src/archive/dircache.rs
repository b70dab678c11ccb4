//! Directory resolution cache.
//!
//! Maps normalized archive paths (no leading or trailing separators) to
//! resolved directory nodes. The empty path always maps to the overlay's
//! root directory. Entries are added lazily and never evicted: the archive
//! cannot change under the overlay.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::decoder::{DecodeResult, DirNode, Lookup};
use super::error::{ArchiveError, ArchiveResult};
use super::path::split_last;

/// Outcome of resolving a path to a directory.
#[derive(Debug)]
pub enum Resolved {
    /// The path is a directory.
    Dir(Arc<dyn DirNode>),
    /// A segment of the path is a file, so the walk stops there.
    IsFile,
    /// Some segment of the path does not exist.
    NotFound,
}

/// Memoizes directory lookups along archive paths.
pub struct DirCache {
    dirs: RwLock<HashMap<String, Arc<dyn DirNode>>>,
}

impl std::fmt::Debug for DirCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirCache")
            .field("cached", &self.dirs.read().len())
            .finish()
    }
}

impl DirCache {
    /// Create a cache whose empty path resolves to `root`.
    pub fn new(root: Arc<dyn DirNode>) -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(String::new(), root);
        Self {
            dirs: RwLock::new(dirs),
        }
    }

    /// The directory the empty path resolves to.
    pub fn root(&self) -> Arc<dyn DirNode> {
        let dirs = self.dirs.read();
        Arc::clone(&dirs[""])
    }

    /// Number of cached directories, root included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.dirs.read().len()
    }

    /// Resolve `path` to a directory.
    ///
    /// Cache hits only take the shared lock. A miss takes the exclusive
    /// lock once and holds it for the whole walk.
    pub fn resolve(&self, path: &str) -> DecodeResult<Resolved> {
        let path = path.trim_matches('/');
        if let Some(dir) = self.dirs.read().get(path) {
            return Ok(Resolved::Dir(Arc::clone(dir)));
        }
        let mut dirs = self.dirs.write();
        Self::resolve_locked(&mut dirs, path)
    }

    /// Walk `path` one segment at a time from the root, reusing cached
    /// prefixes. Call with the write lock held.
    fn resolve_locked(
        dirs: &mut HashMap<String, Arc<dyn DirNode>>,
        path: &str,
    ) -> DecodeResult<Resolved> {
        let mut current = Arc::clone(&dirs[""]);
        let mut prefix = String::with_capacity(path.len());
        // Cached paths are prefix-closed: after one miss, none follow.
        let mut cached = true;

        for leaf in path.split('/').filter(|s| !s.is_empty()) {
            let parent_len = prefix.len();
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(leaf);

            if cached {
                if let Some(dir) = dirs.get(&prefix) {
                    current = Arc::clone(dir);
                    continue;
                }
                cached = false;
            }

            trace!(parent = &prefix[..parent_len], leaf, "resolving directory");
            current = match current.lookup(leaf)? {
                Lookup::Dir(dir) => {
                    dirs.insert(prefix.clone(), Arc::clone(&dir));
                    dir
                }
                Lookup::File(_) => return Ok(Resolved::IsFile),
                Lookup::NotFound => return Ok(Resolved::NotFound),
            };
        }
        Ok(Resolved::Dir(current))
    }

    /// Find the directory at `path`.
    pub fn find_dir(&self, path: &str) -> ArchiveResult<Arc<dyn DirNode>> {
        match self.resolve(path)? {
            Resolved::Dir(dir) => Ok(dir),
            Resolved::IsFile => Err(ArchiveError::is_a_file(path.trim_matches('/'))),
            Resolved::NotFound => Err(ArchiveError::directory_not_found(path.trim_matches('/'))),
        }
    }

    /// Find the directory `name` lives in, and its leaf name.
    pub fn find_parent(&self, name: &str) -> ArchiveResult<(Arc<dyn DirNode>, String)> {
        let name = name.trim_matches('/');
        let (parent_path, leaf) = split_last(name);
        let parent = self.find_dir(parent_path)?;
        Ok((parent, leaf.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::MemTree;
    use std::sync::atomic::Ordering;

    fn tree() -> MemTree {
        MemTree::new()
            .file("a/b.txt", b"abcd")
            .dir("a/empty")
            .file("a/deep/er/file.bin", b"xyz")
            .file("top.txt", b"top")
    }

    #[test]
    fn test_empty_path_is_root() {
        let (root, counters) = tree().build();
        let cache = DirCache::new(root.clone());

        for path in ["", "/", "//"] {
            let dir = cache.find_dir(path).unwrap();
            assert!(Arc::ptr_eq(&dir, &cache.root()));
        }
        assert_eq!(counters.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolves_nested_and_caches_parents() {
        let (root, _counters) = tree().build();
        let cache = DirCache::new(root);

        let dir = cache.find_dir("a/deep/er").unwrap();
        assert_eq!(dir.info().name, "er");
        // "", "a", "a/deep", "a/deep/er"
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_cached_node_survives_decoder_failure() {
        let (root, counters) = tree().build();
        let cache = DirCache::new(root);

        let first = cache.find_dir("a/deep").unwrap();
        counters.fail.store(true, Ordering::SeqCst);

        let second = cache.find_dir("a/deep").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let third = cache.find_dir("/a/deep/").unwrap();
        assert!(Arc::ptr_eq(&first, &third));

        // Anything uncached now hits the failing decoder.
        assert!(matches!(
            cache.find_dir("a/empty"),
            Err(ArchiveError::Decode(_))
        ));
    }

    #[test]
    fn test_file_is_distinguished_from_missing() {
        let (root, _counters) = tree().build();
        let cache = DirCache::new(root);

        assert!(matches!(cache.resolve("a/b.txt").unwrap(), Resolved::IsFile));
        assert!(matches!(cache.resolve("a/nope").unwrap(), Resolved::NotFound));
        assert!(matches!(cache.resolve("nope/a").unwrap(), Resolved::NotFound));
        // A file part way down stops the walk.
        assert!(matches!(cache.resolve("a/b.txt/c").unwrap(), Resolved::IsFile));
        assert!(matches!(
            cache.find_dir("a/b.txt/c/d"),
            Err(ArchiveError::IsAFile(_))
        ));

        assert!(matches!(
            cache.find_dir("a/b.txt"),
            Err(ArchiveError::IsAFile(p)) if p == "a/b.txt"
        ));
        assert!(matches!(
            cache.find_dir("a/nope"),
            Err(ArchiveError::DirectoryNotFound(p)) if p == "a/nope"
        ));
    }

    #[test]
    fn test_doubled_separators_are_skipped() {
        let (root, _counters) = tree().build();
        let cache = DirCache::new(root);

        let dir = cache.find_dir("a//deep///er").unwrap();
        assert_eq!(dir.info().name, "er");
        let clean = cache.find_dir("a/deep/er").unwrap();
        assert!(Arc::ptr_eq(&dir, &clean));
    }

    #[test]
    fn test_deep_missing_path() {
        let (root, counters) = tree().build();
        let cache = DirCache::new(root);

        let deep = "x/".repeat(10_000);
        assert!(matches!(cache.resolve(&deep).unwrap(), Resolved::NotFound));
        assert_eq!(counters.lookups.load(Ordering::SeqCst), 1);

        let below_file = format!("a/b.txt/{deep}");
        assert!(matches!(cache.resolve(&below_file).unwrap(), Resolved::IsFile));
    }

    #[test]
    fn test_deep_existing_path() {
        let depth = 500;
        let path = vec!["d"; depth].join("/");
        let (root, counters) = MemTree::new().file(&format!("{path}/leaf"), b"x").build();
        let cache = DirCache::new(root);

        let dir = cache.find_dir(&path).unwrap();
        assert_eq!(dir.info().name, "d");
        assert_eq!(cache.len(), depth + 1);
        assert_eq!(counters.lookups.load(Ordering::SeqCst), depth);

        // A second walk is served from the cache.
        cache.find_dir(&format!("{path}/")).unwrap();
        assert_eq!(counters.lookups.load(Ordering::SeqCst), depth);
    }

    #[test]
    fn test_find_parent() {
        let (root, _counters) = tree().build();
        let cache = DirCache::new(root);

        let (dir, leaf) = cache.find_parent("/a/b.txt").unwrap();
        assert_eq!(dir.info().name, "a");
        assert_eq!(leaf, "b.txt");

        let (dir, leaf) = cache.find_parent("top.txt").unwrap();
        assert!(Arc::ptr_eq(&dir, &cache.root()));
        assert_eq!(leaf, "top.txt");

        assert!(matches!(
            cache.find_parent("missing/file"),
            Err(ArchiveError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_resolution() {
        let (root, counters) = tree().build();
        let cache = DirCache::new(root);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        cache.find_dir("a/deep/er").unwrap();
                        cache.find_dir("a/empty").unwrap();
                    }
                });
            }
        });

        // Each directory is looked up in its parent exactly once.
        assert_eq!(counters.lookups.load(Ordering::SeqCst), 4);
    }
}
