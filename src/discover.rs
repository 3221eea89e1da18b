//! Turning user-supplied paths into nodes.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::ArchiveFormat;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::node::{NodeKind, PathNode};

/// Build the node list for `paths`, in argument order.
///
/// - a directory becomes a directory node, unless it holds no regular file
/// - an archive file becomes an archive node
/// - a supported file becomes a directory node of its parent, starting on it
///
/// With [`IndexConfig::recursive`], every subdirectory and archive below a
/// directory argument is registered as well, in sorted walk order. A
/// directory is never registered twice.
///
/// # Errors
///
/// [`Error::InvalidSource`] when a path does not exist.
pub fn discover(paths: &[PathBuf], config: &Arc<IndexConfig>) -> Result<Vec<PathNode>> {
    let mut registry = Registry {
        config,
        nodes: Vec::new(),
        directories: HashSet::new(),
    };

    for path in paths {
        let path = std::path::absolute(path)?;
        if !path.exists() {
            return Err(Error::InvalidSource(path));
        }

        if path.is_dir() {
            registry.directory(&path)?;
            if config.recursive {
                registry.walk(&path)?;
            }
        } else if let Some(format) = ArchiveFormat::from_path(&path) {
            registry.archive(format, &path)?;
        } else if path.is_file() && config.supported.is_supported(&path) {
            registry.start_file(&path)?;
        } else {
            warn!(path = %path.display(), "ignoring unsupported path");
        }
    }

    Ok(registry.nodes)
}

struct Registry<'a> {
    config: &'a Arc<IndexConfig>,
    nodes: Vec<PathNode>,
    directories: HashSet<PathBuf>,
}

impl Registry<'_> {
    fn directory(&mut self, dir: &Path) -> Result<()> {
        if self.directories.contains(dir) || !has_regular_file(dir) {
            return Ok(());
        }
        debug!(dir = %dir.display(), "registering directory");
        self.nodes
            .push(PathNode::create(NodeKind::Directory, dir, self.config.clone())?);
        self.directories.insert(dir.to_path_buf());
        Ok(())
    }

    fn archive(&mut self, format: ArchiveFormat, path: &Path) -> Result<()> {
        debug!(archive = %path.display(), "registering archive");
        self.nodes.push(PathNode::create(
            NodeKind::Archive(format),
            path,
            self.config.clone(),
        )?);
        Ok(())
    }

    fn start_file(&mut self, file: &Path) -> Result<()> {
        let Some(parent) = file.parent() else {
            return Err(Error::InvalidSource(file.to_path_buf()));
        };
        if self.directories.contains(parent) {
            return Ok(());
        }
        debug!(file = %file.display(), "registering directory of file");
        self.nodes
            .push(PathNode::create(NodeKind::Directory, file, self.config.clone())?);
        self.directories.insert(parent.to_path_buf());
        Ok(())
    }

    fn walk(&mut self, root: &Path) -> Result<()> {
        let entries = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    None
                }
            });

        for entry in entries {
            let path = entry.path();
            if entry.file_type().is_dir() {
                self.directory(path)?;
            } else if let Some(format) = ArchiveFormat::from_path(path) {
                if path.is_file() {
                    self.archive(format, path)?;
                }
            }
        }
        Ok(())
    }
}

fn has_regular_file(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().is_file()),
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot read directory");
            false
        }
    }
}
