//! # pathnodes
//!
//! Traversal core for browsing images spread over directories and
//! archives as a single ordered list.
//!
//! Each content source is a [`PathNode`]: a directory, or a ZIP, TAR or
//! RAR/7z archive whose members are extracted lazily into a per-node cache
//! directory. Nodes are sequenced by a [`PathNodeStore`], and a
//! [`PathIndex`] hides the two levels behind one `seek(offset, whence)`.
//!
//! ## Features
//!
//! - Directory and archive nodes, filtered by extension and sorted
//! - Native ZIP reading (STORED and DEFLATE, ZIP64, CRC-32 checked)
//! - TAR and gzip-compressed TAR through the `tar` crate
//! - RAR, CBR and 7z through an external `7z` program
//! - Lazy member extraction to `blake3(name) + ext` cache files
//! - Loop mode, skipping of empty nodes, boundary callback
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use pathnodes::{IndexConfig, PathIndex, Traversal, Whence};
//!
//! fn main() -> pathnodes::Result<()> {
//!     let config = Arc::new(IndexConfig::default().with_loop_mode(false));
//!     let paths = [PathBuf::from("comics/volume1.cbz"), PathBuf::from("photos")];
//!     let mut index = PathIndex::open(&paths, config, |reason| eprintln!("{reason}"))?;
//!
//!     while let Some(member) = index.current_item() {
//!         println!("{}", member.name());
//!         if index.seek(1, Whence::Cur)? != Traversal::Moved {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod index;
pub mod io;
pub mod item;
pub mod node;
pub mod store;
pub mod types;
pub mod zip;

pub use archive::{ArchiveBackend, ArchiveFormat};
pub use cli::Cli;
pub use config::IndexConfig;
pub use error::{Error, Result};
pub use index::{BoundaryReason, PathIndex, SharedIndex, Traversal};
pub use io::{LocalFileReader, ReadAt};
pub use item::{ContentItem, cache_file_name};
pub use node::{Direction, Emptiness, Member, NodeKind, PathNode, SeekOutcome, Whence};
pub use store::{PathNodeStore, StoreMove};
pub use types::SupportedTypes;
pub use zip::{ZipExtractor, ZipFileEntry};
