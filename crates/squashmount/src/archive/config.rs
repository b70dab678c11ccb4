//! Mount configuration.
//!
//! A mount is described by a small RON record:
//!
//! ```ron
//! (
//!     remote: "images/rootfs.sqfs",
//!     prefix: "rootfs",
//!     root: "etc",
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a mount configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Construction record for an archive overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Path of the archive file in the wrapped storage.
    pub remote: String,
    /// External mount point the archive contents appear under.
    #[serde(default)]
    pub prefix: String,
    /// Archive-internal path mounted as the namespace root.
    #[serde(default)]
    pub root: String,
}

impl MountConfig {
    /// Configuration mounting `remote` at the top with no prefix.
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            ..Self::default()
        }
    }

    /// Set the mount prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the archive-internal root.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Parse a configuration from a RON string.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Load a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = MountConfig::from_ron_str(
            r#"(remote: "images/rootfs.sqfs", prefix: "rootfs", root: "etc")"#,
        )
        .unwrap();
        assert_eq!(
            config,
            MountConfig::new("images/rootfs.sqfs")
                .with_prefix("rootfs")
                .with_root("etc")
        );
    }

    #[test]
    fn test_defaults() {
        let config = MountConfig::from_ron_str(r#"(remote: "a.sqfs")"#).unwrap();
        assert_eq!(config.prefix, "");
        assert_eq!(config.root, "");
    }

    #[test]
    fn test_parse_error() {
        let err = MountConfig::from_ron_str("(prefix: 3)").unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mount.ron");
        std::fs::write(&path, r#"(remote: "b.sqfs", prefix: "mnt")"#).unwrap();

        let config = MountConfig::load(&path).unwrap();
        assert_eq!(config.remote, "b.sqfs");
        assert_eq!(config.prefix, "mnt");

        assert!(matches!(
            MountConfig::load(dir.path().join("missing.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
