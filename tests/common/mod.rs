#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;

use pathnodes::{BoundaryReason, IndexConfig, PathIndex};

/// Write a ZIP archive with every member DEFLATE-compressed.
pub fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in members {
        let mut crc = flate2::Crc::new();
        crc.update(data);
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        let payload = enc.finish().unwrap();
        let offset = out.len() as u32;

        out.extend_from_slice(b"PK\x03\x04");
        out.write_u16::<LittleEndian>(20).unwrap();
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

        central.extend_from_slice(b"PK\x01\x02");
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(20).unwrap();
        central.write_u16::<LittleEndian>(0).unwrap();
        central.write_u16::<LittleEndian>(8).unwrap();
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

    fs::write(path, out).unwrap();
}

/// Write an uncompressed TAR archive of regular files.
pub fn write_tar(path: &Path, members: &[(&str, &[u8])]) {
    let mut builder = tar::Builder::new(File::create(path).unwrap());
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.finish().unwrap();
}

/// Create `root/name` holding `files`, each containing its own name.
pub fn make_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for file in files {
        fs::write(dir.join(file), file.as_bytes()).unwrap();
    }
    dir
}

/// Open an index over `paths`, reporting boundaries through a channel.
pub fn open_index(
    cache_root: &Path,
    paths: &[PathBuf],
    loop_mode: bool,
) -> (PathIndex, mpsc::Receiver<BoundaryReason>) {
    let config = Arc::new(IndexConfig::new(cache_root).with_loop_mode(loop_mode));
    let (tx, rx) = mpsc::channel();
    let index = PathIndex::open(paths, config, move |reason| {
        tx.send(reason).unwrap();
    })
    .unwrap();
    (index, rx)
}

/// File name (directories) or member name (archives) of the current item.
pub fn current_name(index: &PathIndex) -> String {
    let member = index.current_item().expect("cursor on an item");
    match member.as_item() {
        Some(item) => item.member_name().to_string(),
        None => member
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned(),
    }
}

/// Entries currently inside the cache root.
pub fn cache_entries(cache_root: &Path) -> usize {
    match fs::read_dir(cache_root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
