//! Explicit configuration handed to nodes, the store and the index.

use std::path::{Path, PathBuf};

use crate::types::SupportedTypes;

/// Default external program used for RAR/CBR/7z archives.
pub const DEFAULT_SEVEN_ZIP_PROGRAM: &str = "7z";

/// Traversal and cache settings shared by every node of one index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Wrap around at collection boundaries instead of terminating.
    pub loop_mode: bool,
    /// Register subdirectories and nested archives of directory arguments.
    pub recursive: bool,
    /// Parent of every per-node extraction directory.
    pub cache_root: PathBuf,
    /// Which files and archive members are displayable.
    pub supported: SupportedTypes,
    /// Extract the current archive member as soon as the cursor lands on it.
    pub preaccess: bool,
    /// Program used to list and extract RAR/CBR/7z archives.
    pub seven_zip_program: PathBuf,
}

impl IndexConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            loop_mode: false,
            recursive: false,
            cache_root: cache_root.into(),
            supported: SupportedTypes::default(),
            preaccess: false,
            seven_zip_program: PathBuf::from(DEFAULT_SEVEN_ZIP_PROGRAM),
        }
    }

    /// `<system temp dir>/pathnodes`
    pub fn default_cache_root() -> PathBuf {
        std::env::temp_dir().join("pathnodes")
    }

    pub fn with_loop_mode(mut self, loop_mode: bool) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_supported(mut self, supported: SupportedTypes) -> Self {
        self.supported = supported;
        self
    }

    pub fn with_preaccess(mut self, preaccess: bool) -> Self {
        self.preaccess = preaccess;
        self
    }

    pub fn with_seven_zip_program(mut self, program: impl AsRef<Path>) -> Self {
        self.seven_zip_program = program.as_ref().to_path_buf();
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(Self::default_cache_root())
    }
}
