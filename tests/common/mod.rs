//! In-memory zip fixtures and readers that chop up their input.

#![allow(dead_code)]

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{write::DeflateEncoder, Compression, Crc};
use rc_zip_stream::parse::{DosDateTime, MsdosTimestamp};

pub const STORE: u16 = 0;
pub const DEFLATE: u16 = 8;

/// Timestamp every fixture entry carries
pub const MODIFIED: DosDateTime = DosDateTime {
    year: 2024,
    month: 3,
    day: 15,
    hour: 10,
    minute: 30,
    second: 20,
};

struct CentralRecord {
    name: Vec<u8>,
    method: u16,
    flags: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    header_offset: u32,
}

/// Lays out a zip file the way a streaming writer would: local headers and
/// content first, then the central directory and its end record.
#[derive(Default)]
pub struct ZipBuilder {
    out: Vec<u8>,
    central: Vec<CentralRecord>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Bytes that aren't part of any record (a stub before the first entry,
    /// a data descriptor between two, ...)
    pub fn junk(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.raw_entry(name.as_bytes(), STORE, 0, data, data)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        self.raw_entry(name.as_bytes(), DEFLATE, 0, data, &compressed)
    }

    pub fn dir(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.raw_entry(name.as_bytes(), STORE, 0, b"", b"")
    }

    /// Sets the comment of the first central directory header
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    /// Writes a local file header for `plain` with `payload` as its content.
    pub fn raw_entry(
        mut self,
        name: &[u8],
        method: u16,
        flags: u16,
        plain: &[u8],
        payload: &[u8],
    ) -> Self {
        let mut crc = Crc::new();
        crc.update(plain);
        let record = CentralRecord {
            name: name.to_vec(),
            method,
            flags,
            crc32: crc.sum(),
            compressed_size: payload.len() as u32,
            uncompressed_size: plain.len() as u32,
            header_offset: self.out.len() as u32,
        };

        let modified = timestamp();
        let w = &mut self.out;
        w.extend_from_slice(b"PK\x03\x04");
        w.write_u16::<LittleEndian>(20).unwrap(); // version needed
        w.write_u16::<LittleEndian>(flags).unwrap();
        w.write_u16::<LittleEndian>(method).unwrap();
        w.write_u16::<LittleEndian>(modified.time).unwrap();
        w.write_u16::<LittleEndian>(modified.date).unwrap();
        w.write_u32::<LittleEndian>(record.crc32).unwrap();
        w.write_u32::<LittleEndian>(record.compressed_size).unwrap();
        w.write_u32::<LittleEndian>(record.uncompressed_size).unwrap();
        w.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        w.write_u16::<LittleEndian>(0).unwrap(); // extra field length
        w.extend_from_slice(name);
        w.extend_from_slice(payload);

        self.central.push(record);
        self
    }

    /// Local headers and content only, as if the stream was cut before the
    /// central directory.
    pub fn finish_without_central_directory(self) -> Vec<u8> {
        self.out
    }

    pub fn finish(mut self) -> Vec<u8> {
        let modified = timestamp();
        let cd_offset = self.out.len() as u32;
        let w = &mut self.out;
        for (i, r) in self.central.iter().enumerate() {
            let comment: &[u8] = if i == 0 { &self.comment } else { b"" };
            w.extend_from_slice(b"PK\x01\x02");
            w.write_u16::<LittleEndian>(0x0314).unwrap(); // made by: unix, 2.0
            w.write_u16::<LittleEndian>(20).unwrap(); // version needed
            w.write_u16::<LittleEndian>(r.flags).unwrap();
            w.write_u16::<LittleEndian>(r.method).unwrap();
            w.write_u16::<LittleEndian>(modified.time).unwrap();
            w.write_u16::<LittleEndian>(modified.date).unwrap();
            w.write_u32::<LittleEndian>(r.crc32).unwrap();
            w.write_u32::<LittleEndian>(r.compressed_size).unwrap();
            w.write_u32::<LittleEndian>(r.uncompressed_size).unwrap();
            w.write_u16::<LittleEndian>(r.name.len() as u16).unwrap();
            w.write_u16::<LittleEndian>(0).unwrap(); // extra field length
            w.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
            w.write_u16::<LittleEndian>(0).unwrap(); // disk number start
            w.write_u16::<LittleEndian>(0).unwrap(); // internal attributes
            w.write_u32::<LittleEndian>(0).unwrap(); // external attributes
            w.write_u32::<LittleEndian>(r.header_offset).unwrap();
            w.extend_from_slice(&r.name);
            w.extend_from_slice(comment);
        }
        let cd_size = w.len() as u32 - cd_offset;

        w.extend_from_slice(b"PK\x05\x06");
        w.write_u16::<LittleEndian>(0).unwrap(); // disk number
        w.write_u16::<LittleEndian>(0).unwrap(); // disk with central directory
        w.write_u16::<LittleEndian>(self.central.len() as u16).unwrap();
        w.write_u16::<LittleEndian>(self.central.len() as u16).unwrap();
        w.write_u32::<LittleEndian>(cd_size).unwrap();
        w.write_u32::<LittleEndian>(cd_offset).unwrap();
        w.write_u16::<LittleEndian>(0).unwrap(); // comment length

        self.out
    }
}

pub fn timestamp() -> MsdosTimestamp {
    MsdosTimestamp::from_components(&MODIFIED).unwrap()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Some bytes that don't compress well, and don't contain zip signatures.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2654435761) | 1;
    (0..len)
        .map(|_| {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            match (state >> 24) as u8 {
                b'P' => b'p',
                b => b,
            }
        })
        .collect()
}

/// Returns at most one byte per read
pub struct OneByteReadWrapper<R>(pub R);

impl<R> io::Read for OneByteReadWrapper<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(1);
        self.0.read(&mut buf[..len])
    }
}

/// Returns at most `chunk` bytes per read, and counts reads
pub struct ChunkedReader<R> {
    pub inner: R,
    pub chunk: usize,
    pub reads: usize,
}

impl<R> ChunkedReader<R> {
    pub fn new(inner: R, chunk: usize) -> Self {
        Self {
            inner,
            chunk,
            reads: 0,
        }
    }
}

impl<R> io::Read for ChunkedReader<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Fails with the given error kind once `ok_bytes` have been served
pub struct FailingReader<R> {
    pub inner: R,
    pub ok_bytes: usize,
    pub kind: io::ErrorKind,
}

impl<R> io::Read for FailingReader<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.ok_bytes == 0 {
            return Err(self.kind.into());
        }
        let len = buf.len().min(self.ok_bytes);
        let n = self.inner.read(&mut buf[..len])?;
        self.ok_bytes -= n;
        Ok(n)
    }
}
