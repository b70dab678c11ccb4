//! Translation between external (prefixed) paths and archive paths.
//!
//! External paths carry the mount prefix: with prefix `mnt`, the archive
//! member `a/b.txt` is visible as `mnt/a/b.txt`. Archive paths are
//! relative to the overlay's root directory and never start or end with
//! a separator.

use super::error::{ArchiveError, ArchiveResult};

/// Converts paths between the external namespace and the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    prefix: String,
    /// `prefix + "/"`, or empty when the prefix is empty.
    prefix_slash: String,
}

impl PathTranslator {
    /// Create a translator for the given mount prefix.
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/').to_string();
        let prefix_slash = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        Self {
            prefix,
            prefix_slash,
        }
    }

    /// The mount prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The mount prefix with a trailing separator, or empty.
    pub fn prefix_slash(&self) -> &str {
        &self.prefix_slash
    }

    /// Strip the mount prefix from an external path.
    ///
    /// Every path reaching here must lie under the prefix; one that
    /// doesn't is a caller bug and fails with [`ArchiveError::Internal`].
    pub fn strip_prefix(&self, remote: &str) -> ArchiveResult<String> {
        let remote = remote.trim_matches('/');
        if remote == self.prefix {
            return Ok(String::new());
        }
        match remote.strip_prefix(self.prefix_slash.as_str()) {
            Some(rest) => Ok(rest.to_string()),
            None => Err(ArchiveError::internal(format!(
                "{remote:?} doesn't start with prefix {:?}",
                self.prefix_slash
            ))),
        }
    }

    /// External path of `name` inside the archive directory `dir`.
    pub fn to_external(&self, dir: &str, name: &str) -> String {
        format!("{}{}", self.prefix_slash, join(dir, name))
    }
}

/// Join two archive path fragments with a single separator.
pub(crate) fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{dir}/{name}"),
    }
}

/// Split after the last separator: `"a/b/c"` → `("a/", "c")`, `"c"` → `("", "c")`.
pub(crate) fn split_last(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Parent of an archive path, or empty at the top.
pub(crate) fn parent_of(path: &str) -> &str {
    let path = path.trim_matches('/');
    split_last(path).0.trim_end_matches('/')
}
