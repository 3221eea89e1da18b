use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{ArchiveBackend, normalize_member_name};
use crate::error::{Error, Result};
use crate::io::LocalFileReader;
use crate::zip::{ZipExtractor, ZipFileEntry};

/// ZIP/CBZ backend. The Central Directory is parsed once, at open time.
pub struct ZipBackend {
    path: PathBuf,
    extractor: ZipExtractor<LocalFileReader>,
    names: Vec<String>,
    entries: HashMap<String, ZipFileEntry>,
}

impl ZipBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path).map_err(|e| Error::archive(path, format!("{e:#}")))?;
        let extractor = ZipExtractor::new(Arc::new(reader));
        let listing = extractor
            .list_files()
            .map_err(|e| Error::archive(path, format!("{e:#}")))?;

        let mut names = Vec::new();
        let mut entries = HashMap::new();
        for entry in listing.into_iter().filter(|e| !e.is_directory) {
            let name = normalize_member_name(&entry.file_name);
            // A name may appear twice in appended archives; keep the first
            if !entries.contains_key(&name) {
                names.push(name.clone());
                entries.insert(name, entry);
            }
        }

        debug!(archive = %path.display(), members = names.len(), "opened zip archive");

        Ok(Self {
            path: path.to_path_buf(),
            extractor,
            names,
            entries,
        })
    }

    fn entry(&self, member: &str) -> Result<&ZipFileEntry> {
        self.entries
            .get(member)
            .ok_or_else(|| Error::extraction(member, format!("not found in {}", self.path.display())))
    }
}

impl ArchiveBackend for ZipBackend {
    fn list_members(&self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }

    fn read_member(&self, member: &str) -> Result<Vec<u8>> {
        let entry = self.entry(member)?;
        self.extractor
            .extract_to_memory(entry)
            .map_err(|e| Error::extraction(member, format!("{e:#}")))
    }

    fn extract(&self, member: &str, dest: &Path) -> Result<()> {
        let entry = self.entry(member)?;
        self.extractor
            .extract_to_file(entry, dest)
            .map_err(|e| Error::extraction(member, format!("{e:#}")))
    }
}
