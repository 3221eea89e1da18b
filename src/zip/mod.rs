//! ZIP archive parsing and extraction.
//!
//! Backs the ZIP/CBZ archive nodes. Listing reads only the Central
//! Directory; a member's bytes are read the first time its content item
//! is materialized.
//!
//! - [`structures`]: ZIP format records (EOCD, ZIP64 locator, entries)
//! - [`parser`]: binary parsing of those records from a [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: member extraction (STORED and DEFLATE, CRC-32 checked)
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
