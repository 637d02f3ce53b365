use pretty_hex::PrettyHex;
use std::fmt;

use crate::error::{Error, FormatError};

/// A raw zip string, with no specific encoding.
///
/// This is what's read from a record's trailer, before it's decoded
/// (see [crate::encoding]).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ZipString(pub Vec<u8>);

impl<'a> From<&'a [u8]> for ZipString {
    fn from(slice: &'a [u8]) -> Self {
        Self(slice.into())
    }
}

impl fmt::Debug for ZipString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "[non-utf8 string: {}]", self.0.hex_dump()),
        }
    }
}

/// A raw u8 slice, with no specific structure.
///
/// Extra fields are kept verbatim in this form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ZipBytes(pub Vec<u8>);

impl<'a> From<&'a [u8]> for ZipBytes {
    fn from(slice: &'a [u8]) -> Self {
        Self(slice.into())
    }
}

impl fmt::Debug for ZipBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const MAX_SHOWN_SIZE: usize = 10;
        let data = &self.0[..];
        let (slice, extra) = if data.len() > MAX_SHOWN_SIZE {
            (&self.0[..MAX_SHOWN_SIZE], Some(data.len() - MAX_SHOWN_SIZE))
        } else {
            (&self.0[..], None)
        };
        write!(f, "{}", slice.hex_dump())?;
        if let Some(extra) = extra {
            write!(f, " (+ {} bytes)", extra)?;
        }
        Ok(())
    }
}

/// Checks that `bytes` holds a whole fixed-size record starting with
/// `signature`, and returns the part that follows the signature.
pub(crate) fn record_fields<'a>(
    bytes: &'a [u8],
    length: usize,
    signature: &'static str,
) -> Result<&'a [u8], Error> {
    if bytes.len() < length {
        return Err(FormatError::TruncatedHeader {
            expected: length,
            actual: bytes.len(),
        }
        .into());
    }

    let (magic, fields) = bytes[..length].split_at(4);
    if magic != signature.as_bytes() {
        let mut actual = [0u8; 4];
        actual.copy_from_slice(magic);
        let mut expected = [0u8; 4];
        expected.copy_from_slice(signature.as_bytes());
        return Err(FormatError::InvalidSignature { expected, actual }.into());
    }

    Ok(fields)
}
