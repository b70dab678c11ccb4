//! squashmount: browse a squashfs archive without mounting it.
//!
//! Usage:
//!   squashmount --archive images/rootfs.sqfs ls etc
//!   squashmount --archive images/rootfs.sqfs cat etc/hosts --offset 10 --limit 20
//!   squashmount --config mount.ron tree
//!
//! A RON config supplies the archive, prefix and root; flags given on the
//! command line override it. Set `RUST_LOG=squashmount=debug` to see the
//! overlay's decisions.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use squashmount::{
    ArchiveFs, ListEntry, LocalBackend, MountConfig, Mounted, VfsOps, archivers, find_archiver,
};

/// Read-only access to squashfs archives.
#[derive(Parser, Debug)]
#[command(name = "squashmount")]
#[command(about = "Browse squashfs archives without mounting them", long_about = None)]
struct Cli {
    /// RON mount configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Archive file on the local filesystem
    #[arg(short, long, global = true)]
    archive: Option<PathBuf>,

    /// Path prefix the archive contents appear under
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Directory (or file) inside the archive to mount as the root
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a directory
    Ls {
        /// Directory to list (default: the mount prefix)
        path: Option<String>,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Write a file's contents to stdout
    Cat {
        path: String,
        /// Skip this many bytes
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Stop at this absolute byte position (exclusive)
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Show the metadata of one path
    Stat { path: String },

    /// Print the whole tree below a directory
    Tree {
        /// Directory to start from (default: the mount prefix)
        path: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = mount_config(&cli)?;
    let fs = mount(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Ls { path, recursive } => {
            let dir = path.unwrap_or_else(|| fs.prefix().to_string());
            let entries = if recursive {
                fs.list_recursive(&dir)?
            } else {
                fs.list(&dir)?
            };
            for entry in &entries {
                writeln!(out, "{}", format_entry(entry))?;
            }
        }
        Commands::Cat {
            path,
            offset,
            limit,
        } => {
            let mut reader = fs
                .open(&path, offset, limit)
                .with_context(|| format!("failed to open {path}"))?;
            io::copy(&mut reader, &mut out).with_context(|| format!("failed to read {path}"))?;
        }
        Commands::Stat { path } => {
            let entry = fs.stat(&path)?;
            writeln!(out, "{}", format_entry(&entry))?;
        }
        Commands::Tree { path } => {
            let dir = path.unwrap_or_else(|| fs.prefix().to_string());
            let mut entries = fs.list_recursive(&dir)?;
            entries.sort_by(|a, b| a.remote().cmp(b.remote()));
            for entry in &entries {
                let depth = entry.remote().matches('/').count();
                let marker = if entry.is_dir() { "/" } else { "" };
                writeln!(out, "{}{}{marker}", "  ".repeat(depth), entry.name())?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Merge the config file (if any) with command-line overrides.
fn mount_config(cli: &Cli) -> Result<MountConfig> {
    let mut config = match &cli.config {
        Some(path) => MountConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MountConfig::default(),
    };
    if let Some(archive) = &cli.archive {
        config.remote = archive.to_string_lossy().into_owned();
    }
    if let Some(prefix) = &cli.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if config.remote.is_empty() {
        bail!("no archive given; pass --archive or a config with `remote`");
    }
    Ok(config)
}

/// Open the archive through a local storage rooted at its directory.
fn mount(config: &MountConfig) -> Result<ArchiveFs> {
    let path = Path::new(&config.remote);
    let file_name = path
        .file_name()
        .with_context(|| format!("not a file path: {}", config.remote))?
        .to_string_lossy()
        .into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if find_archiver(&file_name).is_none() {
        let known: Vec<&str> = archivers().iter().map(|a| a.extension).collect();
        tracing::warn!(
            archive = %file_name,
            known = ?known,
            "unrecognized extension, reading as squashfs"
        );
    }

    let storage: Arc<dyn VfsOps> = Arc::new(LocalBackend::new(dir));
    let local = MountConfig {
        remote: file_name,
        ..config.clone()
    };
    let mounted = ArchiveFs::from_config(storage, &local)
        .with_context(|| format!("failed to mount {}", config.remote))?;
    if let Mounted::SingleObject(fs) = &mounted {
        tracing::info!(root = %fs.root(), "root names a file, mounted as a single object");
    }
    Ok(mounted.into_fs())
}

fn format_entry(entry: &ListEntry) -> String {
    let mtime = entry
        .mod_time()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    match entry {
        ListEntry::Dir(_) => format!("d {:>12} {mtime:>12} {}/", "-", entry.remote()),
        ListEntry::Object(obj) => format!("- {:>12} {mtime:>12} {}", obj.size(), entry.remote()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "squashmount",
            "--archive",
            "images/root.sqfs",
            "--root",
            "etc",
            "ls",
        ]);
        let config = mount_config(&cli).unwrap();
        assert_eq!(config.remote, "images/root.sqfs");
        assert_eq!(config.root, "etc");
        assert_eq!(config.prefix, "");
    }

    #[test]
    fn test_missing_archive() {
        let cli = Cli::parse_from(["squashmount", "stat", "x"]);
        assert!(mount_config(&cli).is_err());
    }

    #[test]
    fn test_cat_range_flags() {
        let cli = Cli::parse_from([
            "squashmount",
            "cat",
            "a/b",
            "--offset",
            "1",
            "--limit",
            "3",
            "-a",
            "x.sqfs",
        ]);
        match cli.command {
            Commands::Cat {
                path,
                offset,
                limit,
            } => {
                assert_eq!(path, "a/b");
                assert_eq!(offset, 1);
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
