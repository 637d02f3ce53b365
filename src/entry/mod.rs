//! Reading the content of one entry.
//!
//! An entry's content is exactly `compressed_size` bytes of the stream,
//! starting right after its local file header's trailer. [EntryContent] serves
//! those bytes (or, for deflate entries, their decompressed form) in chunks
//! borrowed from the archive's buffer.

use std::{cmp, io, ops::Deref};

use tracing::{debug, trace};

#[cfg(feature = "deflate")]
mod deflate_dec;

#[cfg(feature = "deflate")]
use deflate_dec::DeflateDec;

use crate::{
    error::{Error, Warning},
    parse::{Entry, Method},
    source::ByteSource,
};

/// Don't trust `uncompressed_size` for more than this when pre-allocating.
const MAX_PREALLOC: u64 = 1024 * 1024;

#[cfg(feature = "deflate")]
#[derive(Default, Debug)]
pub(crate) struct DecompressOutcome {
    /// Number of bytes read from input
    pub(crate) bytes_read: usize,

    /// Number of bytes written to the decoder's output buffer
    pub(crate) bytes_written: usize,

    /// The compressed stream reached its end marker
    pub(crate) done: bool,
}

#[cfg(feature = "deflate")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HasMoreInput {
    Yes,
    No,
}

enum Decoder {
    /// Content is served as-is: stored entries, and methods we can't decode
    Raw,

    #[cfg(feature = "deflate")]
    Deflate(Box<DeflateDec>),
}

/// Where we're at in an entry's compressed byte budget.
#[derive(Debug)]
struct Budget {
    compressed_size: u64,

    /// Compressed bytes consumed from the source so far
    served: u64,

    /// No more chunks will be produced
    finished: bool,

    /// An error was returned while reading content
    failed: bool,
}

impl Budget {
    #[inline]
    fn remaining(&self) -> u64 {
        self.compressed_size - self.served
    }
}

/// Decoding state of the current entry. Owned by the archive, so it outlives
/// the [EntryContent] handles that borrow it.
pub(crate) struct ContentState {
    decoder: Decoder,
    budget: Budget,
}

impl ContentState {
    /// Picks a decoder for `entry`. Methods we can't decode are passed through
    /// raw, and a warning is recorded.
    pub(crate) fn new(entry: &Entry, warnings: &mut Vec<Warning>) -> Self {
        let decoder = match entry.method {
            Method::Store => Decoder::Raw,
            #[cfg(feature = "deflate")]
            Method::Deflate => Decoder::Deflate(Default::default()),
            method => {
                warnings.push(Warning::UnsupportedCompressionMethod(method));
                Decoder::Raw
            }
        };

        Self {
            decoder,
            budget: Budget {
                compressed_size: entry.compressed_size,
                served: 0,
                finished: entry.compressed_size == 0,
                failed: false,
            },
        }
    }

    /// Reading this entry's content returned an error: the stream position is
    /// unknown, and traversal can't go on.
    pub(crate) fn failed(&self) -> bool {
        self.budget.failed
    }

    /// Consumes and discards whatever is left of the compressed budget, so the
    /// source is positioned right after this entry's content.
    pub(crate) fn drain<R>(
        &mut self,
        entry: &Entry,
        source: &mut ByteSource<R>,
    ) -> Result<(), Error>
    where
        R: io::Read,
    {
        let leftover = self.budget.remaining();
        if leftover > 0 {
            debug!(name = %entry.name, leftover, "draining unread entry content");
            let skipped = source.skip(leftover)?;
            self.budget.served += skipped;
            if skipped < leftover {
                self.budget.failed = true;
                return Err(truncated(entry, self.budget.served));
            }
        }
        self.budget.finished = true;
        Ok(())
    }

    fn pending(&self) -> usize {
        match &self.decoder {
            Decoder::Raw => 0,
            #[cfg(feature = "deflate")]
            Decoder::Deflate(dec) => dec.pending(),
        }
    }
}

/// The content of the entry currently yielded by the archive.
///
/// Chunks are borrowed from the archive's buffer (or the inflater's), so each
/// one must be dropped before asking for the next. Content that isn't read is
/// drained by the archive when moving on to the next entry.
pub struct EntryContent<'a, R> {
    entry: &'a Entry,
    source: &'a mut ByteSource<R>,
    state: &'a mut ContentState,
}

impl<'a, R> EntryContent<'a, R>
where
    R: io::Read,
{
    pub(crate) fn new(
        entry: &'a Entry,
        source: &'a mut ByteSource<R>,
        state: &'a mut ContentState,
    ) -> Self {
        Self {
            entry,
            source,
            state,
        }
    }

    /// Returns the next chunk of content, or `None` once the entry is fully
    /// read. Stored entries are served straight out of the source's buffer.
    ///
    /// After an error, no more chunks are produced.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>, Error> {
        self.next_chunk_max(usize::MAX)
    }

    /// Number of compressed bytes consumed from the source so far
    pub fn compressed_bytes_served(&self) -> u64 {
        self.state.budget.served
    }

    /// Number of compressed bytes not consumed yet
    pub fn remaining(&self) -> u64 {
        self.state.budget.remaining()
    }

    /// True once every chunk has been handed out
    pub fn is_consumed(&self) -> bool {
        let budget = &self.state.budget;
        budget.finished && budget.remaining() == 0 && self.state.pending() == 0
    }

    /// Reads the whole (remaining) content into memory.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        let capacity = cmp::min(self.entry.uncompressed_size, MAX_PREALLOC) as usize;
        let mut out = Vec::with_capacity(capacity);
        while let Some(chunk) = self.next_chunk()? {
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }

    fn next_chunk_max(&mut self, max: usize) -> Result<Option<&[u8]>, Error> {
        let entry = self.entry;
        let source = &mut *self.source;
        let state = &mut *self.state;
        if state.budget.failed {
            return Ok(None);
        }

        let res = match &mut state.decoder {
            Decoder::Raw => raw_chunk(entry, source, &mut state.budget, max),
            #[cfg(feature = "deflate")]
            Decoder::Deflate(dec) => deflate_chunk(entry, source, &mut state.budget, dec, max),
        };
        match res {
            Ok(chunk) => Ok(chunk),
            Err(e) => {
                state.budget.failed = true;
                Err(e)
            }
        }
    }
}

impl<R> io::Read for EntryContent<'_, R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.next_chunk_max(buf.len())? {
            Some(chunk) => {
                let n = chunk.len();
                buf[..n].copy_from_slice(chunk);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

fn raw_chunk<'s, R>(
    entry: &Entry,
    source: &'s mut ByteSource<R>,
    budget: &mut Budget,
    max: usize,
) -> Result<Option<&'s [u8]>, Error>
where
    R: io::Read,
{
    if budget.finished {
        return Ok(None);
    }

    let want = cmp::min(budget.remaining(), cmp::min(max, source.capacity()) as u64) as usize;
    let chunk = source.read(want)?;
    if chunk.is_empty() {
        return Err(truncated(entry, budget.served));
    }

    budget.served += chunk.len() as u64;
    if budget.remaining() == 0 {
        budget.finished = true;
    }
    trace!(len = chunk.len(), remaining = budget.remaining(), "raw chunk");
    Ok(Some(chunk))
}

#[cfg(feature = "deflate")]
fn deflate_chunk<'s, R>(
    entry: &Entry,
    source: &'s mut ByteSource<R>,
    budget: &mut Budget,
    dec: &'s mut DeflateDec,
    max: usize,
) -> Result<Option<&'s [u8]>, Error>
where
    R: io::Read,
{
    loop {
        if dec.pending() > 0 {
            return Ok(Some(dec.take(max)));
        }

        if budget.finished {
            // the deflate stream may end before the declared size
            let leftover = budget.remaining();
            if leftover > 0 {
                debug!(name = %entry.name, leftover, "skipping bytes after end of deflate stream");
                let skipped = source.skip(leftover)?;
                budget.served += skipped;
                if skipped < leftover {
                    return Err(truncated(entry, budget.served));
                }
            }
            return Ok(None);
        }

        if budget.remaining() == 0 {
            return Err(decompression_failed(
                entry,
                "compressed data ended before the end of the deflate stream",
            ));
        }

        if !source.fill_window()? {
            return Err(truncated(entry, budget.served));
        }

        let window = source.window();
        let avail = cmp::min(window.len() as u64, budget.remaining()) as usize;
        let has_more_input = if (avail as u64) < budget.remaining() {
            HasMoreInput::Yes
        } else {
            HasMoreInput::No
        };

        let outcome = dec
            .decompress(&window[..avail], has_more_input)
            .map_err(|msg| decompression_failed(entry, msg))?;
        trace!(?outcome, served = budget.served, "inflated");

        source.consume(outcome.bytes_read);
        budget.served += outcome.bytes_read as u64;

        if outcome.done {
            budget.finished = true;
        } else if outcome.bytes_read == 0 && outcome.bytes_written == 0 {
            return Err(decompression_failed(entry, "deflate stream made no progress"));
        }
    }
}

fn truncated(entry: &Entry, actual: u64) -> Error {
    Error::TruncatedEntryContent {
        name: entry.name.clone(),
        offset: entry.header_offset,
        expected: entry.compressed_size,
        actual,
    }
}

#[cfg(feature = "deflate")]
fn decompression_failed(entry: &Entry, msg: impl Into<String>) -> Error {
    Error::DecompressionFailed {
        name: entry.name.clone(),
        offset: entry.header_offset,
        method: entry.method,
        msg: msg.into(),
    }
}

/// An entry yielded by [StreamingArchive](crate::StreamingArchive): its
/// metadata, the warnings collected while decoding its header, and its
/// content.
///
/// Only one `ZipEntry` can be alive at a time: it mutably borrows the archive.
pub struct ZipEntry<'a, R> {
    entry: &'a Entry,
    warnings: &'a [Warning],
    content: EntryContent<'a, R>,
}

impl<'a, R> ZipEntry<'a, R>
where
    R: io::Read,
{
    pub(crate) fn new(
        entry: &'a Entry,
        warnings: &'a [Warning],
        content: EntryContent<'a, R>,
    ) -> Self {
        Self {
            entry,
            warnings,
            content,
        }
    }

    /// Metadata from the local file header
    pub fn entry(&self) -> &'a Entry {
        self.entry
    }

    /// Name of the entry
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    /// True for directory entries, which have no content
    pub fn is_directory(&self) -> bool {
        self.entry.is_dir()
    }

    /// Non-fatal problems found while decoding the header
    pub fn warnings(&self) -> &'a [Warning] {
        self.warnings
    }

    /// The entry's content
    pub fn content(&mut self) -> &mut EntryContent<'a, R> {
        &mut self.content
    }

    /// Gives up the metadata, keeping only the content
    pub fn into_content(self) -> EntryContent<'a, R> {
        self.content
    }

    /// Reads the whole (remaining) content into memory.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        self.content.read_to_vec()
    }
}

impl<R> Deref for ZipEntry<'_, R> {
    type Target = Entry;

    fn deref(&self) -> &Self::Target {
        self.entry
    }
}

impl<R> io::Read for ZipEntry<'_, R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.content.read(buf)
    }
}
