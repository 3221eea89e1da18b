use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use super::{ArchiveBackend, normalize_member_name};
use crate::error::{Error, Result};

/// RAR/CBR/7z backend driving an external `7z` executable.
///
/// Listing parses the technical listing (`7z l -slt`); extraction streams
/// a single member to stdout (`7z e -so`).
pub struct SevenZipBackend {
    archive: PathBuf,
    program: PathBuf,
}

impl SevenZipBackend {
    pub fn open(archive: &Path, program: &Path) -> Result<Self> {
        if !archive.is_file() {
            return Err(Error::archive(archive, "does not exist"));
        }
        Ok(Self {
            archive: archive.to_path_buf(),
            program: program.to_path_buf(),
        })
    }

    fn run(&self, args: &[&std::ffi::OsStr]) -> Result<Output> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| Error::ExtractionProgram {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(output)
    }
}

impl ArchiveBackend for SevenZipBackend {
    fn list_members(&self) -> Result<Vec<String>> {
        let output = self.run(&["l".as_ref(), "-slt".as_ref(), self.archive.as_os_str()])?;
        if !output.status.success() {
            return Err(Error::archive(
                &self.archive,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let names: Vec<String> = parse_slt_listing(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .filter(|entry| !entry.is_directory)
            .map(|entry| normalize_member_name(&entry.path))
            .collect();

        debug!(archive = %self.archive.display(), members = names.len(), "listed 7z archive");
        Ok(names)
    }

    fn read_member(&self, member: &str) -> Result<Vec<u8>> {
        // "--" stops switch parsing so members starting with '-' are safe
        let output = self.run(&[
            "e".as_ref(),
            "-so".as_ref(),
            self.archive.as_os_str(),
            "--".as_ref(),
            member.as_ref(),
        ])?;
        if !output.status.success() {
            return Err(Error::extraction(
                member,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(output.stdout)
    }
}

/// One item of a `7z l -slt` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SltEntry {
    pub path: String,
    pub is_directory: bool,
}

/// Parse the technical listing printed by `7z l -slt`.
///
/// The archive header block (before the `----------` separator) also has a
/// `Path = ` line naming the archive itself; only the blocks after the
/// separator describe members. A member is a directory when
/// `Folder = +` or its attributes start with `D`.
pub(crate) fn parse_slt_listing(output: &str) -> Vec<SltEntry> {
    let mut entries = Vec::new();
    let mut current: Option<SltEntry> = None;
    let mut in_members = false;

    for line in output.lines() {
        let line = line.trim();

        if line == "----------" {
            entries.extend(current.take());
            in_members = true;
            continue;
        }
        if !in_members {
            continue;
        }
        if line.is_empty() {
            entries.extend(current.take());
            continue;
        }

        let Some((key, value)) = line.split_once(" =") else {
            continue;
        };
        let value = value.trim_start();

        match key {
            "Path" => {
                entries.extend(current.take());
                current = Some(SltEntry {
                    path: value.to_string(),
                    is_directory: false,
                });
            }
            "Folder" if value == "+" => {
                if let Some(entry) = current.as_mut() {
                    entry.is_directory = true;
                }
            }
            "Attributes" if value.starts_with('D') => {
                if let Some(entry) = current.as_mut() {
                    entry.is_directory = true;
                }
            }
            _ => {}
        }
    }
    entries.extend(current.take());

    entries
}
