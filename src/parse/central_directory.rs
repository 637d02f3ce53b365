use winnow::{
    binary::{le_u16, le_u32},
    PResult, Parser,
};

use crate::{
    error::Error,
    parse::{local::truncated, record_fields, Method, MsdosTimestamp, Version, ZipBytes, ZipString},
};

/// 4.3.12 Central directory structure: File header
///
/// When streaming, reaching the first one of these means all file entries
/// have been seen. It's decoded, but not expanded into an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    /// version made by
    pub creator_version: Version,

    /// version needed to extract
    pub reader_version: Version,

    /// general purpose bit flag
    pub flags: u16,

    /// compression method
    pub method: Method,

    /// last mod file datetime
    pub modified: MsdosTimestamp,

    /// crc32 hash
    pub crc32: u32,

    /// compressed size
    pub compressed_size: u32,

    /// uncompressed size
    pub uncompressed_size: u32,

    /// file name length
    pub name_len: u16,

    /// extra field length
    pub extra_len: u16,

    /// file comment length
    pub comment_len: u16,

    /// disk number start
    pub disk_nbr_start: u16,

    /// internal file attributes
    pub internal_attrs: u16,

    /// external file attributes
    pub external_attrs: u32,

    /// relative offset of local header
    pub header_offset: u32,

    /// name field, empty until [Self::set_trailer] is called
    pub name: ZipString,

    /// extra field, empty until [Self::set_trailer] is called
    pub extra: ZipBytes,

    /// comment field, empty until [Self::set_trailer] is called
    pub comment: ZipString,
}

impl CentralDirectoryHeader {
    /// The signature for a central directory file header
    pub const SIGNATURE: &'static str = "PK\x01\x02";

    /// Size of the fixed part of the record, signature included
    pub const LENGTH: usize = 46;

    /// Parser for the fields following the signature
    pub fn parser(i: &mut &'_ [u8]) -> PResult<Self> {
        let creator_version = Version::parser.parse_next(i)?;
        let reader_version = Version::parser.parse_next(i)?;
        let flags = le_u16.parse_next(i)?;
        let method = Method::parser.parse_next(i)?;
        let modified = MsdosTimestamp::parser.parse_next(i)?;
        let crc32 = le_u32.parse_next(i)?;
        let compressed_size = le_u32.parse_next(i)?;
        let uncompressed_size = le_u32.parse_next(i)?;
        let name_len = le_u16.parse_next(i)?;
        let extra_len = le_u16.parse_next(i)?;
        let comment_len = le_u16.parse_next(i)?;
        let disk_nbr_start = le_u16.parse_next(i)?;
        let internal_attrs = le_u16.parse_next(i)?;
        let external_attrs = le_u32.parse_next(i)?;
        let header_offset = le_u32.parse_next(i)?;

        Ok(Self {
            creator_version,
            reader_version,
            flags,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            name_len,
            extra_len,
            comment_len,
            disk_nbr_start,
            internal_attrs,
            external_attrs,
            header_offset,
            name: Default::default(),
            extra: Default::default(),
            comment: Default::default(),
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

    /// Number of bytes (name + extra field + comment) following the fixed
    /// part of the header.
    pub fn trailer_len(&self) -> usize {
        self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }

    /// Splits the trailer into name, extra field and comment.
    pub fn set_trailer(&mut self, trailer: &[u8]) -> Result<(), Error> {
        if trailer.len() < self.trailer_len() {
            return Err(truncated(self.trailer_len(), trailer.len()));
        }
        let (name, rest) = trailer.split_at(self.name_len as usize);
        let (extra, rest) = rest.split_at(self.extra_len as usize);
        let comment = &rest[..self.comment_len as usize];

        self.name = name.into();
        self.extra = extra.into();
        self.comment = comment.into();
        Ok(())
    }
}
