//! Signature search over the resident window of a [ByteSource](crate::source::ByteSource).
//!
//! Records in a zip stream start with a 4-byte magic value. Between the end of
//! one entry's content and the next record, there may be bytes we don't know
//! about (a data descriptor, padding, a self-extractor stub before the first
//! entry), so the archive iterator searches for the next signature rather than
//! expecting it at a fixed position.

use memchr::memmem;

use crate::parse::{CentralDirectoryHeader, LocalFileHeader};

/// Length of every record signature
pub const SIGNATURE_LEN: usize = 4;

/// How many trailing bytes of a window must survive a refill so a signature
/// split across two reads is still found.
pub(crate) const CARRY_OVER: usize = SIGNATURE_LEN - 1;

/// The kind of record a signature announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A local file header: a file entry follows.
    LocalFile,

    /// A central directory header: there are no file entries left.
    CentralDirectory,
}

impl RecordKind {
    /// The signature this record starts with
    pub fn signature(&self) -> &'static [u8] {
        match self {
            RecordKind::LocalFile => LocalFileHeader::SIGNATURE.as_bytes(),
            RecordKind::CentralDirectory => CentralDirectoryHeader::SIGNATURE.as_bytes(),
        }
    }
}

/// Returns the offset of the first occurrence of `magic` in `haystack`.
#[inline]
pub fn find_signature(haystack: &[u8], magic: &[u8]) -> Option<usize> {
    memmem::find(haystack, magic)
}

/// Returns the offset and kind of the first record signature in `haystack`.
pub fn find_record(haystack: &[u8]) -> Option<(usize, RecordKind)> {
    [RecordKind::LocalFile, RecordKind::CentralDirectory]
        .into_iter()
        .filter_map(|kind| find_signature(haystack, kind.signature()).map(|i| (i, kind)))
        .min_by_key(|(i, _)| *i)
}
