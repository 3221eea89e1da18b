use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_SEVEN_ZIP_PROGRAM, IndexConfig};

#[derive(Parser, Debug)]
#[command(name = "pathnodes")]
#[command(version)]
#[command(about = "Walk images across directories and archives as one list", long_about = None)]
#[command(after_help = "Examples:\n  \
  pathnodes ~/Pictures                 list every image of a directory\n  \
  pathnodes -r --read ~/Comics         walk subdirectories and archives, extracting each page\n  \
  pathnodes --loop --step -1 -n 20 a.cbz   walk backwards, wrapping around")]
pub struct Cli {
    /// Directories, archives or image files
    #[arg(value_name = "PATHS", required = true)]
    pub paths: Vec<PathBuf>,

    /// Wrap around at the ends instead of stopping
    #[arg(long = "loop")]
    pub loop_mode: bool,

    /// Also register subdirectories and archives below directory arguments
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Parent directory for extraction caches
    #[arg(long, value_name = "DIR", env = "PATHNODES_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Program used for RAR/CBR/7z archives
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_SEVEN_ZIP_PROGRAM)]
    pub seven_zip: PathBuf,

    /// Items to move per step (negative walks backwards)
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub step: isize,

    /// Stop after this many items
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,

    /// Extract and read every item, printing its size
    #[arg(long)]
    pub read: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Less output (-q errors only, -qq silent)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::new(
            self.cache_dir
                .clone()
                .unwrap_or_else(IndexConfig::default_cache_root),
        )
        .with_loop_mode(self.loop_mode)
        .with_recursive(self.recursive)
        .with_preaccess(self.read)
        .with_seven_zip_program(&self.seven_zip)
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (q, _) if q > 1 => "off",
            (1, _) => "error",
            (_, 0) => "warn",
            (_, 1) => "info",
            (_, 2) => "debug",
            _ => "trace",
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}
