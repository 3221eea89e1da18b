use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use super::{ArchiveBackend, normalize_member_name};
use crate::error::{Error, Result};

/// Outer compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
}

/// TAR/CBT backend.
///
/// Tar has no central index, so every call streams the archive from the
/// start. Nothing is held open between calls, which keeps the backend
/// trivially shareable across threads.
pub struct TarBackend {
    path: PathBuf,
    compression: TarCompression,
}

impl TarBackend {
    pub fn open(path: &Path, compression: TarCompression) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::archive(path, "not a regular file"));
        }
        Ok(Self {
            path: path.to_path_buf(),
            compression,
        })
    }

    fn archive(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let file = BufReader::new(File::open(&self.path)?);
        let stream: Box<dyn Read> = match self.compression {
            TarCompression::None => Box::new(file),
            TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        };
        Ok(tar::Archive::new(stream))
    }

    /// Stream entries until `member` is found and hand it to `sink`.
    fn with_member<T>(
        &self,
        member: &str,
        sink: impl FnOnce(&mut dyn Read) -> io::Result<T>,
    ) -> Result<T> {
        let mut archive = self.archive()?;
        let entries = archive
            .entries()
            .map_err(|e| Error::archive(&self.path, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| Error::archive(&self.path, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = normalize_member_name(&entry.path()?.to_string_lossy());
            if name == member {
                return sink(&mut entry).map_err(|e| Error::extraction(member, e));
            }
        }

        Err(Error::extraction(
            member,
            format!("not found in {}", self.path.display()),
        ))
    }
}

impl ArchiveBackend for TarBackend {
    fn list_members(&self) -> Result<Vec<String>> {
        let mut archive = self.archive()?;
        let entries = archive
            .entries()
            .map_err(|e| Error::archive(&self.path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::archive(&self.path, e))?;
            if entry.header().entry_type().is_file() {
                names.push(normalize_member_name(&entry.path()?.to_string_lossy()));
            }
        }

        debug!(archive = %self.path.display(), members = names.len(), "listed tar archive");
        Ok(names)
    }

    fn read_member(&self, member: &str) -> Result<Vec<u8>> {
        self.with_member(member, |entry| {
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            Ok(data)
        })
    }

    fn extract(&self, member: &str, dest: &Path) -> Result<()> {
        self.with_member(member, |entry| {
            let mut out = File::create(dest)?;
            io::copy(entry, &mut out)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn append(builder: &mut tar::Builder<impl io::Write>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }

    #[test]
    fn lists_regular_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append(&mut builder, "b.png", b"bb");
        let mut dir_header = tar::Header::new_gnu();
        dir_header.set_entry_type(tar::EntryType::Directory);
        dir_header.set_size(0);
        dir_header.set_mode(0o755);
        dir_header.set_cksum();
        builder
            .append_data(&mut dir_header, "sub/", io::empty())
            .unwrap();
        append(&mut builder, "sub/a.png", b"a");
        builder.finish().unwrap();

        let backend = TarBackend::open(&path, TarCompression::None).unwrap();
        assert_eq!(backend.list_members().unwrap(), ["b.png", "sub/a.png"]);
        assert_eq!(backend.read_member("sub/a.png").unwrap(), b"a");
    }

    #[test]
    fn reads_gzip_compressed_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.tgz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append(&mut builder, "p1.jpg", b"jpeg-bytes");
        builder.into_inner().unwrap().finish().unwrap();

        let backend = TarBackend::open(&path, TarCompression::Gzip).unwrap();
        let dest = dir.path().join("out.jpg");
        backend.extract("p1.jpg", &dest).unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"jpeg-bytes");
    }

    #[test]
    fn missing_member_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append(&mut builder, "a.png", b"a");
        builder.finish().unwrap();

        let backend = TarBackend::open(&path, TarCompression::None).unwrap();
        assert!(matches!(
            backend.read_member("nope.png"),
            Err(Error::Extraction { .. })
        ));
    }
}
