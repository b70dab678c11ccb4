//! Squashfs images for tests, written with `backhand`.

use std::io::Cursor;
use std::path::Path;

use backhand::compression::Compressor;
use backhand::{FilesystemCompressor, FilesystemWriter, NodeHeader};

const MTIME: u32 = 1_700_000_000;

#[derive(Debug, Clone)]
enum Entry {
    Dir(String),
    File(String, Vec<u8>),
    Symlink(String, String),
    Fifo(String),
}

/// Collects a tree and writes it as one squashfs image.
#[derive(Debug, Clone)]
pub(crate) struct ImageBuilder {
    entries: Vec<Entry>,
    compressor: Compressor,
}

impl ImageBuilder {
    /// Gzip image with 4 KiB blocks.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            compressor: Compressor::Gzip,
        }
    }

    pub fn compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.entries.push(Entry::File(path.to_string(), data.to_vec()));
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(Entry::Dir(path.to_string()));
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.entries
            .push(Entry::Symlink(path.to_string(), target.to_string()));
        self
    }

    pub fn fifo(mut self, path: &str) -> Self {
        self.entries.push(Entry::Fifo(path.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let file = NodeHeader::new(0o644, 0, 0, MTIME);
        let dir = NodeHeader::new(0o755, 0, 0, MTIME);

        let mut fs = FilesystemWriter::default();
        fs.set_block_size(4096);
        fs.set_time(MTIME);
        fs.set_root_mode(0o755);
        fs.set_compressor(FilesystemCompressor::new(self.compressor, None).unwrap());

        for entry in &self.entries {
            let path = match entry {
                Entry::Dir(path)
                | Entry::File(path, _)
                | Entry::Symlink(path, _)
                | Entry::Fifo(path) => path,
            };
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs.push_dir_all(parent, dir).unwrap();
                }
            }
            match entry {
                Entry::Dir(path) => fs.push_dir_all(path, dir).unwrap(),
                Entry::File(path, data) => fs
                    .push_file(Cursor::new(data.as_slice()), path, file)
                    .unwrap(),
                Entry::Symlink(path, target) => fs.push_symlink(target, path, file).unwrap(),
                Entry::Fifo(path) => fs.push_fifo(path, file).unwrap(),
            }
        }

        let mut out = Cursor::new(Vec::new());
        fs.write(&mut out).unwrap();
        out.into_inner()
    }
}
