//! Archive backends behind one listing/extraction capability.
//!
//! A [`PathNode`](crate::PathNode) for an archive differs from another only
//! by the backend it opens, so format-specific code lives here and nowhere
//! else:
//!
//! - [`ZipBackend`]: `.zip`, `.cbz`, parsed natively by [`crate::zip`]
//! - [`TarBackend`]: `.tar`, `.cbt`, plus gzip-compressed `.tgz`, `.tar.gz`, `.gz`
//! - [`SevenZipBackend`]: `.rar`, `.cbr`, `.7z`, through an external `7z` program

mod sevenz;
mod tarball;
mod zipfile;

pub use sevenz::SevenZipBackend;
pub use tarball::{TarBackend, TarCompression};
pub use zipfile::ZipBackend;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::Result;

/// Listing and single-member extraction for one opened archive.
///
/// Implementations must be safe to call from several threads at once:
/// content items of one node may be materialized from worker threads.
pub trait ArchiveBackend: Send + Sync {
    /// Names of every regular-file member, in archive order.
    fn list_members(&self) -> Result<Vec<String>>;

    /// Read the whole content of `member` into memory.
    fn read_member(&self, member: &str) -> Result<Vec<u8>>;

    /// Write the content of `member` to `dest`, replacing any existing file.
    fn extract(&self, member: &str, dest: &Path) -> Result<()> {
        let data = self.read_member(member)?;
        fs::write(dest, data)?;
        Ok(())
    }
}

/// Archive formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar(TarCompression),
    SevenZip,
}

impl ArchiveFormat {
    /// Every extension that maps to an archive node.
    pub const EXTENSIONS: &'static [&'static str] = &[
        ".zip", ".cbz", ".tar", ".cbt", ".tgz", ".tar.gz", ".gz", ".rar", ".cbr", ".7z",
    ];

    /// Detect the format from the file name, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();

        if name.ends_with(".zip") || name.ends_with(".cbz") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".gz") {
            Some(ArchiveFormat::Tar(TarCompression::Gzip))
        } else if name.ends_with(".tar") || name.ends_with(".cbt") {
            Some(ArchiveFormat::Tar(TarCompression::None))
        } else if name.ends_with(".rar") || name.ends_with(".cbr") || name.ends_with(".7z") {
            Some(ArchiveFormat::SevenZip)
        } else {
            None
        }
    }

    /// Short name used in cache directory prefixes and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "Zip",
            ArchiveFormat::Tar(_) => "Tar",
            ArchiveFormat::SevenZip => "7z",
        }
    }

    /// Open `path` with the backend for this format.
    pub fn open(&self, path: &Path, config: &IndexConfig) -> Result<Arc<dyn ArchiveBackend>> {
        let backend: Arc<dyn ArchiveBackend> = match self {
            ArchiveFormat::Zip => Arc::new(ZipBackend::open(path)?),
            ArchiveFormat::Tar(compression) => Arc::new(TarBackend::open(path, *compression)?),
            ArchiveFormat::SevenZip => {
                Arc::new(SevenZipBackend::open(path, &config.seven_zip_program)?)
            }
        };
        Ok(backend)
    }
}

/// Strip the leading `./` some archivers write and unify separators.
pub(crate) fn normalize_member_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    name.trim_start_matches("./").to_string()
}
