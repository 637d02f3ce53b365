//! A buffered, forward-only byte source.
//!
//! [ByteSource] owns a single working buffer and reads into it from any
//! [io::Read]. The unread part of the buffer is the *window*: bytes handed out
//! from it are borrowed from the buffer, so they can't be held across the next
//! call that refills it.

use std::{cmp, io};

use tracing::trace;

use crate::{error::Error, scan};

/// Wraps an [io::Read] and serves byte ranges out of a reusable buffer.
///
/// The window is `buf[offset..len]`. `offset` only moves forward until the
/// window is empty and the buffer is refilled; no byte is ever served twice.
pub struct ByteSource<R> {
    rd: R,

    /// Working buffer, allocated once
    buf: Box<[u8]>,

    /// Start of the unread window
    offset: usize,

    /// End of the valid data in `buf`
    len: usize,

    /// Absolute stream offset of `buf[offset]`
    pos: u64,

    /// The underlying reader signaled end-of-data
    eof: bool,

    /// [Self::read] already returned an empty slice after end-of-data
    eof_reported: bool,
}

impl<R> ByteSource<R>
where
    R: io::Read,
{
    /// Default capacity of the working buffer
    pub const DEFAULT_CAPACITY: usize = 8096;

    /// Smallest capacity accepted: fixed-size headers are decoded straight
    /// from the window, so the largest one must fit.
    pub const MIN_CAPACITY: usize = 64;

    /// Create a byte source with the default capacity.
    pub fn new(rd: R) -> Self {
        Self::with_capacity(rd, Self::DEFAULT_CAPACITY)
    }

    /// Create a byte source with the given buffer capacity (raised to
    /// [Self::MIN_CAPACITY] if smaller).
    pub fn with_capacity(rd: R, capacity: usize) -> Self {
        let capacity = cmp::max(capacity, Self::MIN_CAPACITY);
        Self {
            rd,
            buf: vec![0u8; capacity].into_boxed_slice(),
            offset: 0,
            len: 0,
            pos: 0,
            eof: false,
            eof_reported: false,
        }
    }

    /// Capacity of the working buffer
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Absolute offset, in the stream, of the next unread byte
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The bytes currently resident and not yet consumed
    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.buf[self.offset..self.len]
    }

    /// True once the underlying reader has signaled end-of-data (there may
    /// still be bytes in the window).
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// True when the window is empty and the underlying reader is exhausted.
    #[inline]
    pub fn consumed(&self) -> bool {
        self.offset == self.len && self.eof
    }

    /// Marks `count` bytes of the window as consumed.
    ///
    /// Panics if `count` is larger than the window.
    pub(crate) fn consume(&mut self, count: usize) {
        assert!(
            count <= self.len - self.offset,
            "consumed {count} bytes out of a {}-byte window",
            self.len - self.offset
        );
        self.offset += count;
        self.pos += count as u64;
    }

    /// Offset, relative to the window, of the first occurrence of `magic`.
    ///
    /// `None` means the caller must refill and retry, or give up if the
    /// source is exhausted.
    pub fn find_signature(&self, magic: &[u8]) -> Option<usize> {
        scan::find_signature(self.window(), magic)
    }

    /// Returns up to `n` bytes.
    ///
    /// If the window holds at least `n` bytes, they are served without
    /// copying. If it holds fewer, what's left is returned, and the caller
    /// must ask again for the rest. If it's empty, the buffer is refilled
    /// once from the underlying reader. An empty result means the source is
    /// exhausted; calling `read` again after that is an error.
    pub fn read(&mut self, n: usize) -> Result<&[u8], Error> {
        if n == 0 {
            return Ok(&[]);
        }

        if self.offset == self.len {
            if self.eof {
                if self.eof_reported {
                    return Err(Error::SourceAlreadyExhausted);
                }
                self.eof_reported = true;
                return Ok(&[]);
            }

            self.refill()?;
            if self.offset == self.len {
                self.eof_reported = true;
                return Ok(&[]);
            }
        }

        let start = self.offset;
        let count = cmp::min(n, self.len - start);
        self.consume(count);
        Ok(&self.buf[start..start + count])
    }

    /// Appends exactly `n` bytes to `out`, across as many refills as needed.
    /// Returns the number of bytes appended, which is less than `n` only if
    /// the source ran out.
    pub fn read_into(&mut self, n: usize, out: &mut Vec<u8>) -> Result<usize, Error> {
        let mut copied = 0;
        while copied < n {
            let chunk = self.read(n - copied)?;
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(chunk);
            copied += chunk.len();
        }
        Ok(copied)
    }

    /// Discards `n` bytes. Returns the number of bytes discarded, which is
    /// less than `n` only if the source ran out.
    pub fn skip(&mut self, n: u64) -> Result<u64, Error> {
        let mut skipped = 0u64;
        while skipped < n {
            let want = cmp::min(n - skipped, self.capacity() as u64) as usize;
            let chunk = self.read(want)?;
            if chunk.is_empty() {
                break;
            }
            skipped += chunk.len() as u64;
        }
        trace!(skipped, "skipped bytes");
        Ok(skipped)
    }

    /// Makes sure the window is not empty, refilling once if needed. Returns
    /// false if the source is exhausted.
    pub fn fill_window(&mut self) -> Result<bool, Error> {
        if self.offset < self.len {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        self.refill()?;
        Ok(self.offset < self.len)
    }

    /// Moves the window to the start of the buffer, then reads until at least
    /// `n` bytes are resident or the source is exhausted. Returns whether `n`
    /// bytes are resident.
    ///
    /// `n` is capped to the buffer's capacity.
    pub fn fill_at_least(&mut self, n: usize) -> Result<bool, Error> {
        let n = cmp::min(n, self.capacity());
        while self.len - self.offset < n && !self.eof {
            if self.offset > 0 {
                self.buf.copy_within(self.offset..self.len, 0);
                self.len -= self.offset;
                self.offset = 0;
            }

            let read = self.read_once(self.len)?;
            trace!(read, resident = self.len, wanted = n, "fill_at_least");
        }
        Ok(self.len - self.offset >= n)
    }

    /// Gives back the underlying reader. Bytes still in the window are lost.
    pub fn into_inner(self) -> R {
        self.rd
    }

    /// Replaces the (empty) window with a single read from the underlying
    /// reader.
    fn refill(&mut self) -> Result<usize, Error> {
        debug_assert_eq!(self.offset, self.len, "refilling a non-empty window");
        self.offset = 0;
        self.len = 0;
        let read = self.read_once(0)?;
        trace!(read, pos = self.pos, "refilled");
        Ok(read)
    }

    /// Reads once into `buf[at..]`, retrying on interruption, and updates
    /// `len` and `eof`.
    fn read_once(&mut self, at: usize) -> Result<usize, Error> {
        loop {
            match self.rd.read(&mut self.buf[at..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    self.len = at + n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves its data in fixed-size chunks.
    struct Chunked<'a> {
        data: &'a [u8],
        chunk: usize,
        reads: usize,
    }

    impl io::Read for Chunked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn chunked(data: &[u8], chunk: usize) -> Chunked<'_> {
        Chunked {
            data,
            chunk,
            reads: 0,
        }
    }

    #[test]
    fn read_serves_views_then_short_reads() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut src = ByteSource::with_capacity(chunked(&data, 40), 64);

        // first read refills: 40 bytes resident
        assert_eq!(src.read(10).unwrap(), &data[..10]);
        assert_eq!(src.window().len(), 30);
        assert_eq!(src.position(), 10);

        // fewer than requested resident: short read
        assert_eq!(src.read(50).unwrap(), &data[10..40]);
        assert!(src.window().is_empty());

        // empty window: one refill
        assert_eq!(src.read(50).unwrap(), &data[40..80]);
        assert_eq!(src.read(50).unwrap(), &data[80..100]);
        assert_eq!(src.position(), 100);
        assert!(!src.consumed());

        // exhausted: one empty result, then an error
        assert_eq!(src.read(1).unwrap(), &[] as &[u8]);
        assert!(src.consumed());
        assert!(matches!(src.read(1), Err(Error::SourceAlreadyExhausted)));
    }

    #[test]
    fn zero_length_read_does_not_touch_the_source() {
        let mut src = ByteSource::new(chunked(b"abc", 10));
        assert!(src.read(0).unwrap().is_empty());
        assert_eq!(src.rd.reads, 0);
    }

    #[test]
    fn read_into_spans_refills() {
        let data: Vec<u8> = (0..200u8).collect();
        let mut src = ByteSource::with_capacity(chunked(&data, 7), 64);
        let mut out = Vec::new();
        assert_eq!(src.read_into(150, &mut out).unwrap(), 150);
        assert_eq!(out, &data[..150]);

        let mut out = Vec::new();
        assert_eq!(src.read_into(100, &mut out).unwrap(), 50);
        assert_eq!(out, &data[150..]);
    }

    #[test]
    fn fill_at_least_keeps_unread_bytes() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut src = ByteSource::with_capacity(chunked(&data, 5), 64);
        assert!(src.fill_at_least(3).unwrap());
        src.consume(3);

        assert!(src.fill_at_least(30).unwrap());
        assert_eq!(&src.window()[..30], &data[3..33]);
        assert_eq!(src.position(), 3);

        // capped to capacity
        assert!(src.fill_at_least(1000).unwrap());
        assert_eq!(src.window().len(), 64);

        src.consume(64);
        assert!(!src.fill_at_least(64).unwrap());
        assert_eq!(src.window(), &data[67..]);
        assert!(src.is_eof());
    }

    #[test]
    fn skip_and_find_signature() {
        let mut data = vec![0u8; 300];
        data.extend_from_slice(b"PK\x03\x04");
        let mut src = ByteSource::with_capacity(chunked(&data, 1000), 64);
        assert_eq!(src.skip(290).unwrap(), 290);
        assert!(src.fill_at_least(14).unwrap());
        assert_eq!(src.find_signature(b"PK\x03\x04"), Some(10));
        assert_eq!(src.skip(100).unwrap(), 14);
        assert!(src.consumed());
    }

    #[test]
    fn small_capacities_are_raised() {
        let src = ByteSource::with_capacity(chunked(b"", 1), 1);
        assert_eq!(src.capacity(), ByteSource::<Chunked>::MIN_CAPACITY);
    }

    #[test]
    fn io_errors_propagate() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::ConnectionReset.into())
            }
        }
        let mut src = ByteSource::new(Broken);
        assert!(matches!(
            src.read(1),
            Err(Error::IO(e)) if e.kind() == io::ErrorKind::ConnectionReset
        ));
    }
}
