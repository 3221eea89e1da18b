//! Lazily-extracted archive members.
//!
//! A [`ContentItem`] is created for every displayable member when an
//! archive node is populated, but nothing is extracted until the first
//! read. The cache file name is `blake3(member name) + extension`, so
//! nested names like `sub/dir/image.jpg` never need intermediate
//! directories and downstream type sniffing still sees `.jpg`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::archive::ArchiveBackend;
use crate::error::Result;

/// Cache file name for an archive member: hex blake3 digest of the member
/// name, followed by the member's original extension.
pub fn cache_file_name(member: &str) -> String {
    let digest = blake3::hash(member.as_bytes()).to_hex();
    match Path::new(member).extension() {
        Some(ext) => format!("{}.{}", digest, ext.to_string_lossy()),
        None => digest.to_string(),
    }
}

#[derive(Debug, Default)]
struct ItemState {
    materialized: bool,
    used: bool,
}

/// File-like handle to one archive member.
pub struct ContentItem {
    backend: Arc<dyn ArchiveBackend>,
    member_name: String,
    extracted_path: PathBuf,
    state: Mutex<ItemState>,
}

impl ContentItem {
    pub fn new(backend: Arc<dyn ArchiveBackend>, cache_dir: &Path, member_name: String) -> Self {
        let extracted_path = cache_dir.join(cache_file_name(&member_name));
        Self {
            backend,
            member_name,
            extracted_path,
            state: Mutex::new(ItemState::default()),
        }
    }

    /// Path of the member inside the archive.
    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    /// Where the member is (or will be) extracted.
    pub fn extracted_path(&self) -> &Path {
        &self.extracted_path
    }

    /// Last component of the member name.
    pub fn basename(&self) -> &str {
        self.member_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.member_name)
    }

    pub fn is_materialized(&self) -> bool {
        self.state.lock().materialized
    }

    /// Whether any read happened since creation or the last [`close`](Self::close).
    pub fn is_used(&self) -> bool {
        self.state.lock().used
    }

    /// Extract the member to its cache path unless that file already exists.
    ///
    /// The check and the extraction happen under the item lock, so two
    /// threads racing on the same item extract it once.
    pub fn uncompress_file_if_needed(&self) -> Result<&Path> {
        let mut state = self.state.lock();
        if !self.extracted_path.is_file() {
            trace!(member = %self.member_name, dest = %self.extracted_path.display(), "extracting");
            if let Err(err) = self.backend.extract(&self.member_name, &self.extracted_path) {
                // Never leave a truncated file behind to be mistaken for a cache hit
                let _ = fs::remove_file(&self.extracted_path);
                return Err(err);
            }
        }
        state.materialized = true;
        Ok(&self.extracted_path)
    }

    /// Materialize the member and open its cache file for streaming.
    pub fn open(&self) -> Result<BufReader<File>> {
        self.state.lock().used = true;
        let path = self.uncompress_file_if_needed()?;
        Ok(BufReader::new(File::open(path)?))
    }

    /// Read up to `size` bytes from the start of the member, or all of it.
    ///
    /// Every call starts from the beginning of the content.
    pub fn read(&self, size: Option<usize>) -> Result<Vec<u8>> {
        let mut reader = self.open()?;
        let mut data = Vec::new();
        match size {
            Some(limit) => {
                reader.take(limit as u64).read_to_end(&mut data)?;
            }
            None => {
                reader.read_to_end(&mut data)?;
            }
        }
        Ok(data)
    }

    /// Read the first line (including its `\n`), at most `size` bytes.
    pub fn readline(&self, size: Option<usize>) -> Result<Vec<u8>> {
        let reader = self.open()?;
        let mut line = Vec::new();
        match size {
            Some(limit) => {
                reader.take(limit as u64).read_until(b'\n', &mut line)?;
            }
            None => {
                let mut reader = reader;
                reader.read_until(b'\n', &mut line)?;
            }
        }
        Ok(line)
    }

    /// Read lines until EOF, or until at least `hint` bytes were collected.
    pub fn readlines(&self, hint: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let mut reader = self.open()?;
        let mut lines = Vec::new();
        let mut total = 0usize;
        loop {
            let mut line = Vec::new();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            total += line.len();
            lines.push(line);
            if hint.is_some_and(|h| h > 0 && total >= h) {
                break;
            }
        }
        Ok(lines)
    }

    /// Size in bytes of the extracted member. Materializes it.
    pub fn len(&self) -> Result<u64> {
        let path = self.uncompress_file_if_needed()?;
        Ok(fs::metadata(path)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Unlink the cache file. The item can be read again afterwards,
    /// which re-extracts it while its node's cache directory still exists.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if self.extracted_path.exists() {
            if let Err(err) = fs::remove_file(&self.extracted_path) {
                warn!(path = %self.extracted_path.display(), error = %err, "failed to remove cached member");
            }
        }
        state.materialized = false;
        state.used = false;
    }
}

impl std::fmt::Debug for ContentItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentItem")
            .field("member_name", &self.member_name)
            .field("extracted_path", &self.extracted_path)
            .finish_non_exhaustive()
    }
}
