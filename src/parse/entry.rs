use chrono::{offset::Utc, DateTime};

use crate::{
    encoding::Encoding,
    error::{Error, Warning},
    parse::{local::truncated, zero_datetime, LocalFileHeader, Method, Version, ZipBytes},
};

/// Describes a zip archive entry (a file or a directory), as found in its
/// local file header.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Name of the file
    ///
    /// This should be a relative path, separated by `/`. However, there are zip
    /// files in the wild with all sorts of evil variants, so, be conservative
    /// in what you accept.
    pub name: String,

    /// Encoding the name was decoded with
    pub encoding: Encoding,

    /// Compression method: Store, Deflate, etc.
    pub method: Method,

    /// This entry's "last modified" timestamp
    ///
    /// Only the MS-DOS timestamp of the local header is looked at, so this is
    /// local time of wherever the archive was made, with 2-second resolution.
    /// It is the Unix epoch if the timestamp was invalid.
    pub modified: DateTime<Utc>,

    /// CRC32 hash as stored in the local header (not verified)
    pub crc32: u32,

    /// Size in bytes, after compression
    pub compressed_size: u64,

    /// Size in bytes, without compression
    pub uncompressed_size: u64,

    /// General purpose bit flag
    pub flags: u16,

    /// Version needed to extract this entry
    pub reader_version: Version,

    /// Extra field, verbatim
    pub extra: ZipBytes,

    /// Offset of the local file header in the stream
    ///
    /// ```text
    /// [optional non-zip data]
    /// [local file header 1] <------ header_offset points here
    /// [file data 1]
    /// [local file header 2]
    /// ...
    /// [central directory]
    /// ```
    pub header_offset: u64,
}

impl Entry {
    /// Returns true if this entry is a directory: its name ends with a slash,
    /// and it has no content.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/') && self.compressed_size == 0
    }
}

impl LocalFileHeader {
    /// Builds an [Entry] from this header and its trailer (name followed by
    /// extra field). Problems that don't prevent reading the entry are
    /// appended to `warnings`.
    pub fn as_entry(
        &self,
        trailer: &[u8],
        header_offset: u64,
        warnings: &mut Vec<Warning>,
    ) -> Result<Entry, Error> {
        if trailer.len() < self.trailer_len() {
            return Err(truncated(self.trailer_len(), trailer.len()));
        }
        let (name, extra) = trailer[..self.trailer_len()].split_at(self.name_len as usize);

        let (name, encoding) = Encoding::decode_name(name);
        if encoding != Encoding::Utf8 {
            warnings.push(Warning::NonUtf8Name);
        }

        let modified = match self.modified.components() {
            Ok(_) => self.modified.to_datetime().unwrap_or_else(zero_datetime),
            Err(w) => {
                warnings.push(w);
                zero_datetime()
            }
        };

        Ok(Entry {
            name,
            encoding,
            method: self.method,
            modified,
            crc32: self.crc32,
            compressed_size: self.compressed_size as u64,
            uncompressed_size: self.uncompressed_size as u64,
            flags: self.flags,
            reader_version: self.reader_version,
            extra: extra.into(),
            header_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{HostSystem, MsdosTimestamp};
    use chrono::{Datelike, Timelike};

    fn header(name_len: u16, extra_len: u16, compressed_size: u32) -> LocalFileHeader {
        LocalFileHeader {
            reader_version: Version {
                version: 20,
                host_system: HostSystem::MsDos,
            },
            flags: 0,
            method: Method::Store,
            // 2019-09-05 12:12:00
            modified: MsdosTimestamp {
                time: 0x6180,
                date: 0x4f25,
            },
            crc32: 0,
            compressed_size,
            uncompressed_size: compressed_size,
            name_len,
            extra_len,
        }
    }

    #[test]
    fn splits_name_and_extra() {
        let mut warnings = Vec::new();
        let entry = header(5, 3, 5)
            .as_entry(b"a.txt\x01\x02\x03", 120, &mut warnings)
            .unwrap();
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.extra.0, [1, 2, 3]);
        assert_eq!(entry.header_offset, 120);
        assert!(!entry.is_dir());
        assert!(warnings.is_empty());

        assert_eq!(
            (entry.modified.year(), entry.modified.month(), entry.modified.day()),
            (2019, 9, 5)
        );
        assert_eq!((entry.modified.hour(), entry.modified.minute()), (12, 12));
    }

    #[test]
    fn directories_are_structural() {
        let mut warnings = Vec::new();
        let entry = header(4, 0, 0).as_entry(b"dir/", 0, &mut warnings).unwrap();
        assert!(entry.is_dir());

        let entry = header(4, 0, 0).as_entry(b"file", 0, &mut warnings).unwrap();
        assert!(!entry.is_dir());
    }

    #[test]
    fn bad_timestamps_and_names_are_warnings() {
        let mut h = header(5, 0, 0);
        h.modified = MsdosTimestamp::default();

        let mut warnings = Vec::new();
        let entry = h.as_entry(b"\x80.txt", 0, &mut warnings).unwrap();
        assert_eq!(entry.encoding, Encoding::Cp437);
        assert_eq!(entry.name, "Ç.txt");
        assert_eq!(entry.modified, zero_datetime());
        assert_eq!(
            warnings,
            vec![
                Warning::NonUtf8Name,
                Warning::InvalidTimestamp { time: 0, date: 0 }
            ]
        );
    }

    #[test]
    fn short_trailer_is_an_error() {
        let mut warnings = Vec::new();
        assert!(header(5, 3, 0).as_entry(b"a.txt", 0, &mut warnings).is_err());
    }
}
