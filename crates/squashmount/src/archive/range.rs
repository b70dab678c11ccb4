//! Byte-range reads over forward-only streams.

use std::io::{self, Read};

/// Skips a prefix of a stream and optionally bounds what follows.
///
/// Decoded archive members cannot seek, so the skip is done by reading
/// and discarding.
#[derive(Debug)]
pub struct RangeReader<R> {
    inner: R,
    /// Bytes still allowed out; `None` means unbounded.
    remaining: Option<u64>,
}

impl<R: Read> RangeReader<R> {
    /// Discard `offset` bytes of `inner`, then yield bytes up to the
    /// absolute position `limit` (exclusive), or to the end when `None`.
    ///
    /// Fails with `UnexpectedEof` if the stream is shorter than `offset`.
    pub fn new(mut inner: R, offset: u64, limit: Option<u64>) -> io::Result<Self> {
        if offset > 0 {
            let skipped = io::copy(&mut (&mut inner).take(offset), &mut io::sink())?;
            if skipped < offset {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended after {skipped} of {offset} skipped bytes"),
                ));
            }
        }
        Ok(Self {
            inner,
            remaining: limit.map(|end| end.saturating_sub(offset)),
        })
    }

    /// Bytes still allowed out, if bounded.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }
}

impl<R: Read> Read for RangeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = match self.remaining {
            Some(0) => return Ok(0),
            Some(n) => buf.len().min(usize::try_from(n).unwrap_or(usize::MAX)),
            None => buf.len(),
        };
        let n = self.inner.read(&mut buf[..want])?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields at most `chunk` bytes per read, like a block decoder.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.len().min(self.chunk).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn read_range(data: &[u8], offset: u64, limit: Option<u64>) -> Vec<u8> {
        let mut out = Vec::new();
        RangeReader::new(Cursor::new(data), offset, limit)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_unbounded() {
        assert_eq!(read_range(b"abcdef", 0, None), b"abcdef");
        assert_eq!(read_range(b"abcdef", 2, None), b"cdef");
        assert_eq!(read_range(b"abcdef", 6, None), b"");
    }

    #[test]
    fn test_range_law() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        for k in [0u64, 1, 7, 500, 999, 1000] {
            for n in [0u64, 1, 13, 250] {
                if k + n > data.len() as u64 {
                    continue;
                }
                let got = read_range(&data, k, Some(k + n));
                assert_eq!(got, &data[k as usize..(k + n) as usize], "k={k} n={n}");
            }
        }
    }

    #[test]
    fn test_limit_before_offset_yields_nothing() {
        assert_eq!(read_range(b"abcdef", 4, Some(2)), b"");
    }

    #[test]
    fn test_limit_past_end_is_clamped_by_stream() {
        assert_eq!(read_range(b"abc", 1, Some(100)), b"bc");
    }

    #[test]
    fn test_short_stream_fails_skip() {
        let err = RangeReader::new(Cursor::new(b"abc"), 5, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_chunked_inner() {
        let data = b"0123456789abcdef";
        let inner = Trickle { data, chunk: 3 };
        let mut reader = RangeReader::new(inner, 4, Some(11)).unwrap();
        assert_eq!(reader.remaining(), Some(7));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"456789a");
        assert_eq!(reader.remaining(), Some(0));
    }
}
