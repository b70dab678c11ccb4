//! Archive formats known to the overlay, keyed by file extension.

use super::decoder::DecoderFn;

/// One archive format.
#[derive(Debug, Clone, Copy)]
pub struct Archiver {
    /// File extension including the dot, lower case.
    pub extension: &'static str,
    /// Decoder producing the archive's root directory.
    pub decode: DecoderFn,
}

static ARCHIVERS: &[Archiver] = &[
    Archiver {
        extension: ".sqfs",
        decode: crate::squashfs::decode,
    },
    Archiver {
        extension: ".squashfs",
        decode: crate::squashfs::decode,
    },
];

/// Every registered archive format.
pub fn archivers() -> &'static [Archiver] {
    ARCHIVERS
}

/// Find the archive format for `remote` by its extension, ignoring case.
pub fn find_archiver(remote: &str) -> Option<&'static Archiver> {
    let remote = remote.trim_end_matches('/').to_ascii_lowercase();
    ARCHIVERS
        .iter()
        .find(|a| remote.len() > a.extension.len() && remote.ends_with(a.extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_extension() {
        assert_eq!(find_archiver("images/root.sqfs").unwrap().extension, ".sqfs");
        assert_eq!(find_archiver("ROOT.SQFS").unwrap().extension, ".sqfs");
        assert_eq!(find_archiver("a/b.squashfs").unwrap().extension, ".squashfs");
    }

    #[test]
    fn test_every_archiver_is_found() {
        for archiver in archivers() {
            let name = format!("image{}", archiver.extension.to_uppercase());
            assert_eq!(find_archiver(&name).unwrap().extension, archiver.extension);
        }
    }

    #[test]
    fn test_unknown_extension() {
        assert!(find_archiver("root.tar").is_none());
        assert!(find_archiver("sqfs").is_none());
        assert!(find_archiver(".sqfs").is_none());
    }
}
