//! Parsers and types for the records found while streaming a zip file.
//!
//! Contains winnow parsers for the fixed-size part of local file headers and
//! central directory headers, along with the field types they're made of
//! (versions, compression methods, MS-DOS timestamps).
//!
//! All parsers here are based off of the PKWARE appnote.txt. They are pure:
//! callers hand them exactly the bytes of one fixed-size record, and read the
//! variable-length trailer (name, extra field, comment) themselves.

mod method;
pub use method::*;

mod version;
pub use version::*;

mod date_time;
pub use date_time::*;

mod raw;
pub use raw::*;

mod local;
pub use local::*;

mod central_directory;
pub use central_directory::*;

mod entry;
pub use entry::*;
