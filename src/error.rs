//! All error types used in this crate

use crate::parse::Method;

/// Any error that stops the traversal of a zip stream: invalid records,
/// truncated content, corrupt compressed data, or I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not a valid zip stream, or a variant that can't be streamed.
    #[error("format: {0}")]
    Format(#[from] FormatError),

    /// I/O-related error from the underlying source
    #[error("io: {0}")]
    IO(#[from] std::io::Error),

    /// `read` was called again after it already reported the end of the source.
    #[error("source was already exhausted")]
    SourceAlreadyExhausted,

    /// The source ended before an entry's declared compressed size was served.
    #[error(
        "entry {name:?} (header at {offset}) truncated: expected {expected} bytes, got {actual}"
    )]
    TruncatedEntryContent {
        /// name of the entry
        name: String,
        /// absolute offset of the entry's local file header
        offset: u64,
        /// compressed size declared in the local file header
        expected: u64,
        /// compressed bytes actually available
        actual: u64,
    },

    /// The compressed data of an entry could not be decoded.
    #[error("entry {name:?} (header at {offset}): {method:?} decompression error: {msg}")]
    DecompressionFailed {
        /// name of the entry
        name: String,
        /// absolute offset of the entry's local file header
        offset: u64,
        /// The compression method that failed
        method: Method,
        /// Additional information
        msg: String,
    },
}

/// Specific zip format errors, due to invalid or truncated records.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Fewer bytes than a fixed-size record needs were available.
    #[error("truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader {
        /// size of the record, in bytes
        expected: usize,
        /// bytes actually available
        actual: usize,
    },

    /// A record did not start with the signature it was decoded as.
    #[error("invalid signature: expected {expected:02x?}, got {actual:02x?}")]
    InvalidSignature {
        /// signature of the record being decoded
        expected: [u8; 4],
        /// first bytes actually found
        actual: [u8; 4],
    },

    /// The entry's sizes are only known from a data descriptor that follows
    /// its content, so its content can't be delimited in a forward-only pass.
    #[error("entry {name:?} relies on a data descriptor, which can't be streamed")]
    DataDescriptorUnsupported {
        /// name of the entry
        name: String,
    },
}

/// Conditions that don't stop traversal, reported alongside the entry they
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    /// The entry's content is passed through as-is, without decompression.
    #[error("compression method not supported, content is passed through raw: {0:?}")]
    UnsupportedCompressionMethod(Method),

    /// The MS-DOS timestamp has out-of-range components and was ignored.
    #[error("invalid MS-DOS timestamp (time {time:#06x}, date {date:#06x})")]
    InvalidTimestamp {
        /// packed time field
        time: u16,
        /// packed date field
        date: u16,
    },

    /// The name was not valid UTF-8 and was decoded as CP-437 instead.
    #[error("entry name is not valid UTF-8, decoded as cp-437")]
    NonUtf8Name,
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::IO(e) => e,
            e => std::io::Error::other(e),
        }
    }
}
