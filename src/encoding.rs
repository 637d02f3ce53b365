//! Character encodings used in ZIP files.
//!
//! ZIP entry paths may be encoded in a variety of character encodings:
//! historically, CP-437 was used, but most modern zip files use UTF-8.
//!
//! When streaming, names are read before anything else in the archive is
//! known, so there's no archive-wide guess to be made: names are taken as
//! UTF-8 regardless of the language encoding flag, and only names that aren't
//! valid UTF-8 fall back to CP-437.

use std::fmt;

/// Encodings supported by this crate
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    /// [UTF-8](https://en.wikipedia.org/wiki/UTF-8), opt-in for ZIP files.
    Utf8,

    /// [Codepage 437](https://en.wikipedia.org/wiki/Code_page_437), also known as
    /// OEM-US, PC-8, or DOS Latin US.
    ///
    /// It was the original encoding of the zip format.
    Cp437,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Encoding as T;
        match self {
            T::Utf8 => write!(f, "utf-8"),
            T::Cp437 => write!(f, "cp-437"),
        }
    }
}

impl Encoding {
    /// Decodes a name, returning it along with the encoding that was used.
    pub(crate) fn decode_name(i: &[u8]) -> (String, Encoding) {
        match std::str::from_utf8(i) {
            Ok(s) => (s.to_string(), Encoding::Utf8),
            Err(_) => (
                oem_cp::decode_string_complete_table(
                    i,
                    &oem_cp::code_table::DECODING_TABLE_CP437,
                ),
                Encoding::Cp437,
            ),
        }
    }
}
