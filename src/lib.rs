#![warn(missing_docs)]

//! rc-zip-stream reads zip files front to back, from any [std::io::Read],
//! without ever seeking.
//!
//! Entries are found by their local file headers, in stream order, and their
//! content is served in chunks borrowed from a single reusable buffer. The
//! central directory marks the end of the archive.
//!
//! ```no_run
//! use rc_zip_stream::StreamingArchive;
//!
//! # fn main() -> Result<(), rc_zip_stream::Error> {
//! let file = std::fs::File::open("archive.zip")?;
//! let mut archive = StreamingArchive::new(file);
//! while let Some(mut entry) = archive.next_entry()? {
//!     let mut len = 0;
//!     while let Some(chunk) = entry.content().next_chunk()? {
//!         len += chunk.len();
//!     }
//!     println!("{} ({len} bytes)", entry.name());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! It's made up of:
//!
//!   * [parse]: winnow parsers for local file headers and central directory
//!     headers, and the types they decode to
//!   * [source]: the buffered, forward-only byte source
//!   * [scan]: signature search over the buffered window
//!   * [entry]: bounded (and, for deflate, decompressed) entry content
//!   * [archive]: the iterator tying it all together

pub mod archive;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod parse;
pub mod scan;
pub mod source;

pub use archive::{StreamingArchive, StreamingOptions};
pub use entry::{EntryContent, ZipEntry};
pub use error::{Error, FormatError, Warning};
pub use parse::{CentralDirectoryHeader, Entry, LocalFileHeader, Method};
