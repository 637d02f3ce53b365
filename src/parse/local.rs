use winnow::{
    binary::{le_u16, le_u32},
    PResult, Parser,
};

use crate::{
    error::{Error, FormatError},
    parse::{record_fields, Method, MsdosTimestamp, Version},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// 4.3.7 Local file header, fixed-size part.
///
/// The name and extra field follow it in the stream, then the entry's content.
pub struct LocalFileHeader {
    /// version needed to extract
    pub reader_version: Version,

    /// general purpose bit flag
    pub flags: u16,

    /// compression method
    pub method: Method,

    /// last mod file datetime
    pub modified: MsdosTimestamp,

    /// crc-32, carried along but never checked
    pub crc32: u32,

    /// compressed size
    pub compressed_size: u32,

    /// uncompressed size
    pub uncompressed_size: u32,

    /// file name length
    pub name_len: u16,

    /// extra field length
    pub extra_len: u16,
}

impl LocalFileHeader {
    /// The signature for a local file header
    pub const SIGNATURE: &'static str = "PK\x03\x04";

    /// Size of the fixed part of the record, signature included
    pub const LENGTH: usize = 30;

    /// Parser for the fields following the signature
    pub fn parser(i: &mut &'_ [u8]) -> PResult<Self> {
        let reader_version = Version::parser.parse_next(i)?;
        let flags = le_u16.parse_next(i)?;
        let method = Method::parser.parse_next(i)?;
        let modified = MsdosTimestamp::parser.parse_next(i)?;
        let crc32 = le_u32.parse_next(i)?;
        let compressed_size = le_u32.parse_next(i)?;
        let uncompressed_size = le_u32.parse_next(i)?;
        let name_len = le_u16.parse_next(i)?;
        let extra_len = le_u16.parse_next(i)?;

        Ok(Self {
            reader_version,
            flags,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            name_len,
            extra_len,
        })
    }

    /// Decodes the first [Self::LENGTH] bytes of `bytes`, which must start
    /// with [Self::SIGNATURE].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut fields = record_fields(bytes, Self::LENGTH, Self::SIGNATURE)?;
        Self::parser
            .parse_next(&mut fields)
            .map_err(|_| truncated(Self::LENGTH, bytes.len()))
    }

    /// Number of bytes (name + extra field) between the fixed part of the
    /// header and the entry's content.
    pub fn trailer_len(&self) -> usize {
        self.name_len as usize + self.extra_len as usize
    }

    /// Check for the presence of the bit flag that indicates a data descriptor
    /// is present after the file data.
    pub fn has_data_descriptor(&self) -> bool {
        // 4.3.9.1 This descriptor MUST exist if bit 3 of the general
        // purpose bit flag is set (see below).
        self.flags & 0b1000 != 0
    }
}

pub(crate) fn truncated(expected: usize, actual: usize) -> Error {
    FormatError::TruncatedHeader { expected, actual }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::HostSystem;

    fn sample() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"PK\x03\x04");
        b.extend_from_slice(&[20, 0]); // version needed: 2.0, MS-DOS
        b.extend_from_slice(&0x0808u16.to_le_bytes()); // flags
        b.extend_from_slice(&8u16.to_le_bytes()); // deflate
        b.extend_from_slice(&0x6b8au16.to_le_bytes()); // time
        b.extend_from_slice(&0x5821u16.to_le_bytes()); // date
        b.extend_from_slice(&0xdeadbeefu32.to_le_bytes());
        b.extend_from_slice(&1234u32.to_le_bytes());
        b.extend_from_slice(&5678u32.to_le_bytes());
        b.extend_from_slice(&5u16.to_le_bytes());
        b.extend_from_slice(&9u16.to_le_bytes());
        b
    }

    #[test]
    fn decodes_fixed_fields() {
        let bytes = sample();
        assert_eq!(bytes.len(), LocalFileHeader::LENGTH);

        let h = LocalFileHeader::decode(&bytes).unwrap();
        assert_eq!(h.reader_version.version, 20);
        assert_eq!(h.reader_version.host_system, HostSystem::MsDos);
        assert_eq!(h.flags, 0x0808);
        assert_eq!(h.method, Method::Deflate);
        assert_eq!(h.modified, MsdosTimestamp { time: 0x6b8a, date: 0x5821 });
        assert_eq!(h.crc32, 0xdeadbeef);
        assert_eq!(h.compressed_size, 1234);
        assert_eq!(h.uncompressed_size, 5678);
        assert_eq!((h.name_len, h.extra_len), (5, 9));
        assert_eq!(h.trailer_len(), 14);
        assert!(h.has_data_descriptor());
    }

    #[test]
    fn only_the_fixed_part_is_read() {
        let mut bytes = sample();
        bytes.extend_from_slice(b"a.txt");
        let h = LocalFileHeader::decode(&bytes).unwrap();
        assert_eq!(h.name_len, 5);
    }

    #[test]
    fn short_input_is_truncated() {
        let bytes = sample();
        let err = LocalFileHeader::decode(&bytes[..29]).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::TruncatedHeader {
                expected: 30,
                actual: 29
            })
        ));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let mut bytes = sample();
        bytes[2] = 0x01;
        bytes[3] = 0x02;
        let err = LocalFileHeader::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::InvalidSignature { .. })
        ));
    }
}
