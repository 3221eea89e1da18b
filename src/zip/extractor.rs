use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};
use flate2::read::DeflateDecoder;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP member extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Extract member data to memory, inflating and checking the CRC-32
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted {
            bail!("{}: encrypted members are not supported", entry.file_name);
        }
        if entry.is_directory {
            bail!("{}: is a directory", entry.file_name);
        }

        let data_offset = self.parser.get_data_offset(entry)?;
        if data_offset.saturating_add(entry.compressed_size) > self.parser.size() {
            bail!("{}: member data extends past end of archive", entry.file_name);
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw)?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // The declared size is untrusted: read one byte past it so an
                // oversized stream fails the size check instead of growing unbounded
                let mut out = Vec::new();
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .with_context(|| format!("{}: corrupt deflate stream", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "{}: unsupported compression method {} (only STORED and DEFLATE are supported)",
                    entry.file_name,
                    method
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{}: size mismatch (expected {}, got {})",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("{}: CRC-32 mismatch", entry.file_name);
        }

        Ok(data)
    }

    /// Extract member to disk, creating parent directories as needed
    pub fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = self.extract_to_memory(entry)?;

        let mut file = fs::File::create(output_path)?;
        file.write_all(&data)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use flate2::Compression;
    use flate2::write::DeflateEncoder;

    /// In-memory `ReadAt` source
    struct MemReader(Vec<u8>);

    impl ReadAt for MemReader {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let start = (offset as usize).min(self.0.len());
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    fn build_zip(members: &[(&str, &[u8], bool)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for (name, data, deflate) in members {
            let mut crc = flate2::Crc::new();
            crc.update(data);
            let payload = if *deflate {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data).unwrap();
                enc.finish().unwrap()
            } else {
                data.to_vec()
            };
            let method: u16 = if *deflate { 8 } else { 0 };
            let offset = out.len() as u32;

            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(method).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(crc.sum()).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&payload);

            central.extend_from_slice(b"PK\x01\x02");
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(method).unwrap();
            central.write_u32::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(crc.sum()).unwrap();
            central.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            central.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            central.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(offset).unwrap();
            central.extend_from_slice(name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(members.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(members.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out
    }

    #[test]
    fn lists_members_in_archive_order() {
        let zip = build_zip(&[
            ("b.png", b"bbb", false),
            ("dir/", b"", false),
            ("a.png", b"aaaa", false),
        ]);
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["b.png", "dir/", "a.png"]);
        assert!(entries[1].is_directory);
        assert_eq!(entries[2].uncompressed_size, 4);
    }

    #[test]
    fn extracts_stored_and_deflated_members() {
        let body = b"pixels pixels pixels pixels pixels".to_vec();
        let zip = build_zip(&[("raw.bmp", &body, false), ("packed.png", &body, true)]);
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();

        assert_eq!(entries[1].compression_method, CompressionMethod::Deflate);
        assert_eq!(extractor.extract_to_memory(&entries[0]).unwrap(), body);
        assert_eq!(extractor.extract_to_memory(&entries[1]).unwrap(), body);
    }

    #[test]
    fn rejects_corrupted_member_data() {
        let mut zip = build_zip(&[("a.png", b"abcdef", false)]);
        // Payload starts right after the 30-byte header and the 5-byte name
        zip[35] ^= 0xFF;
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();

        let err = extractor.extract_to_memory(&entries[0]).unwrap_err();
        assert!(err.to_string().contains("CRC-32"));
    }

    #[test]
    fn extract_to_file_creates_parent_directories() {
        let zip = build_zip(&[("x.gif", b"GIF89a", false)]);
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.gif");
        extractor.extract_to_file(&entries[0], &out).unwrap();
        assert_eq!(fs::read(out).unwrap(), b"GIF89a");
    }

    /// One DEFLATE member whose Central Directory entry declares
    /// `declared` as its uncompressed size through a ZIP64 extra field
    fn build_zip64_declared_size(name: &str, data: &[u8], declared: u64) -> Vec<u8> {
        let mut crc = flate2::Crc::new();
        crc.update(data);
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        let payload = enc.finish().unwrap();

        let mut out = Vec::new();
        out.extend_from_slice(b"PK\x03\x04");
        out.write_u16::<LittleEndian>(45).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(8).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(crc.sum()).unwrap();
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        let mut central = Vec::new();
        central.extend_from_slice(b"PK\x01\x02");
        central.write_u16::<LittleEndian>(45).unwrap();
        central.write_u16::<LittleEndian>(45).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(8).unwrap();
        central.write_u32::<LittleEndian>(0).unwrap();
        central.write_u32::<LittleEndian>(crc.sum()).unwrap();
        central.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        central.write_u32::<LittleEndian>(0xFFFF_FFFF).unwrap();
        central.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        central.write_u16::<LittleEndian>(12).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u32::<LittleEndian>(0).unwrap();
        central.write_u32::<LittleEndian>(0).unwrap();
        central.extend_from_slice(name.as_bytes());
        central.write_u16::<LittleEndian>(0x0001).unwrap();
        central.write_u16::<LittleEndian>(8).unwrap();
        central.write_u64::<LittleEndian>(declared).unwrap();

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out
    }

    #[test]
    fn absurd_declared_size_is_a_size_mismatch() {
        let zip = build_zip64_declared_size("huge.png", b"tiny tiny tiny", u64::MAX);
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();
        assert_eq!(entries[0].uncompressed_size, u64::MAX);

        let err = extractor.extract_to_memory(&entries[0]).unwrap_err();
        assert!(err.to_string().contains("size mismatch"));
    }

    #[test]
    fn stream_longer_than_declared_is_rejected() {
        let zip = build_zip64_declared_size("short.png", b"0123456789", 4);
        let extractor = ZipExtractor::new(Arc::new(MemReader(zip)));
        let entries = extractor.list_files().unwrap();

        let err = extractor.extract_to_memory(&entries[0]).unwrap_err();
        assert!(err.to_string().contains("expected 4, got 5"));
    }

    #[test]
    fn not_a_zip_is_an_error() {
        let extractor = ZipExtractor::new(Arc::new(MemReader(b"definitely not a zip file".to_vec())));
        assert!(extractor.list_files().is_err());
    }
}
