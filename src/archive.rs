//! Forward-only traversal of a zip stream.
//!
//! Zip files are normally read from the end: the central directory lists
//! every entry and where it lives. [StreamingArchive] reads them from the
//! start instead, one local file header at a time, which works on sources that
//! can't seek (sockets, pipes, HTTP bodies). The tradeoffs:
//!
//!   * Sizes are taken from local file headers, so entries whose sizes are
//!     deferred to a data descriptor can't be read.
//!   * The central directory is the end of the road: it marks that there are
//!     no more entries, and is not read as an index.
//!   * Entries come in stream order, one at a time.

use std::{cmp, io};

use tracing::{debug, trace, warn};

use crate::{
    entry::{ContentState, EntryContent, ZipEntry},
    error::{Error, FormatError, Warning},
    parse::{CentralDirectoryHeader, Entry, LocalFileHeader},
    scan::{self, RecordKind, SIGNATURE_LEN},
    source::ByteSource,
};

/// Signature of the end of central directory record. Only checked for in
/// strict mode: an empty archive starts with it.
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: &[u8] = b"PK\x05\x06";

/// Options for [StreamingArchive::with_options].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingOptions {
    /// Capacity of the working buffer, in bytes. Values below
    /// [ByteSource::MIN_CAPACITY] are raised to it.
    pub buffer_capacity: usize,

    /// Fail with [FormatError::InvalidSignature] if the stream doesn't start
    /// with a zip record, instead of scanning past leading bytes (for example,
    /// a self-extractor stub).
    pub strict: bool,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: ByteSource::<io::Empty>::DEFAULT_CAPACITY,
            strict: false,
        }
    }
}

impl StreamingOptions {
    /// Sets the capacity of the working buffer
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Enables or disables strict mode
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// The entry last handed out, with everything needed to drain it later.
struct Current {
    entry: Entry,
    warnings: Vec<Warning>,
    content: ContentState,
}

enum State {
    /// Looking for the next record
    AwaitingHeader,

    /// An entry was handed out. Whatever the caller didn't read of its content
    /// is drained before looking for the next record.
    EntryYielded { current: Box<Current> },

    /// Central directory reached, source exhausted, or a fatal error occurred
    Done,
}

/// Reads a zip archive front to back from any [io::Read].
///
/// ```no_run
/// use std::io::Read;
/// use rc_zip_stream::StreamingArchive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut archive = StreamingArchive::new(std::io::stdin());
/// while let Some(mut entry) = archive.next_entry()? {
///     if entry.is_directory() {
///         continue;
///     }
///     let mut contents = String::new();
///     entry.read_to_string(&mut contents)?;
///     println!("{}: {} bytes", entry.name(), contents.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamingArchive<R> {
    source: ByteSource<R>,
    options: StreamingOptions,
    state: State,
    central_directory: Option<CentralDirectoryHeader>,
    entries_read: usize,
    started: bool,
}

impl<R> StreamingArchive<R>
where
    R: io::Read,
{
    /// Reads `rd` with default options.
    pub fn new(rd: R) -> Self {
        Self::with_options(rd, StreamingOptions::default())
    }

    /// Reads `rd` with the given options.
    pub fn with_options(rd: R, options: StreamingOptions) -> Self {
        Self {
            source: ByteSource::with_capacity(rd, options.buffer_capacity),
            options,
            state: State::AwaitingHeader,
            central_directory: None,
            entries_read: 0,
            started: false,
        }
    }

    /// Returns the next entry, or `None` once the central directory (or the
    /// end of the stream) is reached.
    ///
    /// Whatever wasn't read of the previous entry's content is skipped first.
    /// After an error, including one returned while reading an entry's
    /// content, this returns `None`.
    pub fn next_entry(&mut self) -> Result<Option<ZipEntry<'_, R>>, Error> {
        if let Err(e) = self.advance() {
            debug!(%e, entries_read = self.entries_read, "stopping after error");
            self.state = State::Done;
            return Err(e);
        }

        match &mut self.state {
            State::EntryYielded { current } => {
                let current = &mut **current;
                let content =
                    EntryContent::new(&current.entry, &mut self.source, &mut current.content);
                Ok(Some(ZipEntry::new(&current.entry, &current.warnings, content)))
            }
            _ => Ok(None),
        }
    }

    /// The first central directory header, if the traversal got that far and
    /// the whole record (name, extra field and comment included) was there.
    pub fn central_directory(&self) -> Option<&CentralDirectoryHeader> {
        self.central_directory.as_ref()
    }

    /// Number of entries handed out so far
    pub fn entries_read(&self) -> usize {
        self.entries_read
    }

    /// True once there are no more entries to read
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Stops reading and gives back the underlying reader, positioned
    /// somewhere past the last byte consumed.
    pub fn cancel(self) -> R {
        debug!(entries_read = self.entries_read, "cancelled");
        self.source.into_inner()
    }

    /// Moves to the next entry (or to [State::Done]).
    fn advance(&mut self) -> Result<(), Error> {
        loop {
            match &mut self.state {
                State::Done => return Ok(()),
                State::EntryYielded { current } => {
                    if current.content.failed() {
                        debug!(name = %current.entry.name, "entry content failed, can't go on");
                        self.state = State::Done;
                        return Ok(());
                    }
                    current.content.drain(&current.entry, &mut self.source)?;
                    self.state = State::AwaitingHeader;
                }
                State::AwaitingHeader => {
                    if !self.started {
                        self.started = true;
                        if self.options.strict {
                            self.check_prefix()?;
                        }
                    }

                    self.state = match self.scan()? {
                        Some(RecordKind::LocalFile) => {
                            let current = self.read_local_header()?;
                            self.entries_read += 1;
                            State::EntryYielded {
                                current: Box::new(current),
                            }
                        }
                        Some(RecordKind::CentralDirectory) => {
                            self.read_central_directory()?;
                            State::Done
                        }
                        None => {
                            debug!(
                                entries_read = self.entries_read,
                                "source ended without a central directory"
                            );
                            State::Done
                        }
                    };
                    return Ok(());
                }
            }
        }
    }

    /// Strict mode: the stream must start with a zip record.
    fn check_prefix(&mut self) -> Result<(), Error> {
        self.source.fill_at_least(SIGNATURE_LEN)?;
        let window = self.source.window();
        let n = cmp::min(window.len(), SIGNATURE_LEN);
        let mut actual = [0u8; SIGNATURE_LEN];
        actual[..n].copy_from_slice(&window[..n]);

        let known = [
            RecordKind::LocalFile.signature(),
            RecordKind::CentralDirectory.signature(),
            END_OF_CENTRAL_DIRECTORY_SIGNATURE,
        ];
        if known.iter().any(|sig| *sig == &actual[..]) {
            return Ok(());
        }

        let mut expected = [0u8; SIGNATURE_LEN];
        expected.copy_from_slice(RecordKind::LocalFile.signature());
        Err(FormatError::InvalidSignature { expected, actual }.into())
    }

    /// Finds the next record signature and positions the source on it.
    /// Returns `None` if the source ends first.
    fn scan(&mut self) -> Result<Option<RecordKind>, Error> {
        let start = self.source.position();
        loop {
            if let Some((at, kind)) = scan::find_record(self.source.window()) {
                self.source.consume(at);
                let skipped = self.source.position() - start;
                if skipped > 0 {
                    debug!(skipped, offset = self.source.position(), ?kind, "skipped stray bytes");
                }
                return Ok(Some(kind));
            }

            // a signature may be split across refills
            let stray = self.source.window().len().saturating_sub(scan::CARRY_OVER);
            self.source.consume(stray);
            if self.source.is_eof() {
                return Ok(None);
            }

            let want = self.source.window().len() + 1;
            self.source.fill_at_least(want)?;
            trace!(resident = self.source.window().len(), "scanning");
        }
    }

    fn read_local_header(&mut self) -> Result<Current, Error> {
        let header_offset = self.source.position();
        self.source.fill_at_least(LocalFileHeader::LENGTH)?;
        let header = LocalFileHeader::decode(self.source.window())?;
        self.source.consume(LocalFileHeader::LENGTH);

        let trailer_len = header.trailer_len();
        let mut trailer = Vec::with_capacity(trailer_len);
        let read = self.source.read_into(trailer_len, &mut trailer)?;
        if read < trailer_len {
            return Err(FormatError::TruncatedHeader {
                expected: trailer_len,
                actual: read,
            }
            .into());
        }

        let mut warnings = Vec::new();
        let entry = header.as_entry(&trailer, header_offset, &mut warnings)?;
        if header.has_data_descriptor() && entry.compressed_size == 0 && !entry.is_dir() {
            return Err(FormatError::DataDescriptorUnsupported { name: entry.name }.into());
        }

        let content = ContentState::new(&entry, &mut warnings);
        for w in &warnings {
            warn!(name = %entry.name, header_offset, "{w}");
        }
        debug!(
            name = %entry.name,
            method = ?entry.method,
            compressed_size = entry.compressed_size,
            header_offset,
            "local file header"
        );

        Ok(Current {
            entry,
            warnings,
            content,
        })
    }

    /// Keeps the first central directory header if it's all there. Nothing
    /// past it is read.
    fn read_central_directory(&mut self) -> Result<(), Error> {
        let offset = self.source.position();
        self.source.fill_at_least(CentralDirectoryHeader::LENGTH)?;
        let mut header = match CentralDirectoryHeader::decode(self.source.window()) {
            Ok(header) => header,
            Err(e) => {
                debug!(offset, %e, "incomplete central directory header");
                return Ok(());
            }
        };
        self.source.consume(CentralDirectoryHeader::LENGTH);

        let mut trailer = Vec::with_capacity(header.trailer_len());
        self.source.read_into(header.trailer_len(), &mut trailer)?;
        match header.set_trailer(&trailer) {
            Ok(()) => {
                debug!(offset, name = ?header.name, "reached central directory");
                self.central_directory = Some(header);
            }
            Err(e) => debug!(offset, %e, "incomplete central directory header"),
        }
        Ok(())
    }
}
