//! Main entry point for the pathnodes CLI application.
//!
//! Walks the collection built from the command-line paths with repeated
//! relative seeks and prints each item it lands on.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pathnodes::{Cli, Member, PathIndex, Traversal, Whence};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = Arc::new(cli.index_config());
    let quiet = cli.is_quiet();
    let mut index = PathIndex::open(&cli.paths, config, move |reason| {
        if !quiet {
            eprintln!("Stopped: {reason}");
        }
    })
    .context("failed to open collection")?;

    walk(&mut index, &cli)
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the current item, then keep seeking by `--step` until the
/// collection ends, the limit is reached, or an unlimited walk lands on an
/// item it already showed.
fn walk(index: &mut PathIndex, cli: &Cli) -> Result<()> {
    let shown = walk_with(index, cli.step, cli.limit, |member| print_member(member, cli.read))?;

    if !cli.is_quiet() {
        eprintln!("{shown} item(s)");
    }
    Ok(())
}

/// Visit items with repeated `seek(step, Cur)` and return how many were
/// visited. Without a limit, a revisited cursor ends the walk: looping
/// walks may cycle without returning to their first item.
fn walk_with(
    index: &mut PathIndex,
    step: isize,
    limit: Option<usize>,
    mut visit: impl FnMut(&Member),
) -> Result<usize> {
    let mut seen = HashSet::new();
    seen.insert(index.cursor());
    let mut shown = 0usize;

    loop {
        if let Some(member) = index.current_item() {
            visit(member);
        }
        shown += 1;

        if limit.is_some_and(|limit| shown >= limit) {
            break;
        }
        if index.seek(step, Whence::Cur)? != Traversal::Moved {
            break;
        }
        if limit.is_none() && !seen.insert(index.cursor()) {
            break;
        }
    }

    Ok(shown)
}

fn print_member(member: &Member, read: bool) {
    if !read {
        println!("{}", member.name());
        return;
    }

    let size: pathnodes::Result<u64> = match member {
        Member::File(path) => fs::metadata(path).map(|m| m.len()).map_err(Into::into),
        Member::Archived(item) => item.len(),
    };
    match size {
        Ok(size) => println!("{:>12}  {}", format_size(size), member.name()),
        // The walk goes on past a member that cannot be extracted
        Err(err) => println!("{:>12}  {}  ({err})", "error", member.name()),
    }
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathnodes::IndexConfig;
    use std::path::Path;

    fn looping_index(root: &Path, dirs: &[(&str, &[&str])]) -> PathIndex {
        let paths: Vec<_> = dirs
            .iter()
            .map(|(name, files)| {
                let dir = root.join(name);
                fs::create_dir_all(&dir).unwrap();
                for file in *files {
                    fs::write(dir.join(file), b"img").unwrap();
                }
                dir
            })
            .collect();
        let config = Arc::new(IndexConfig::new(root.join("cache")).with_loop_mode(true));
        PathIndex::open(&paths, config, |_| {}).unwrap()
    }

    #[test]
    fn looping_walk_with_large_step_terminates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = looping_index(
            tmp.path(),
            &[("a", &["1.png", "2.png"]), ("b", &["3.png", "4.png"])],
        );

        let mut names = Vec::new();
        let shown = walk_with(&mut index, -2, None, |m| names.push(m.name())).unwrap();

        // (a,0) -> (b,1) -> (a,1) -> (b,1) again
        assert_eq!(shown, 3);
        assert!(names[0].ends_with("1.png"));
        assert!(names[1].ends_with("4.png"));
        assert!(names[2].ends_with("2.png"));
    }

    #[test]
    fn looping_walk_stops_after_one_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = looping_index(tmp.path(), &[("a", &["1.png", "2.png"]), ("b", &["3.png"])]);

        assert_eq!(walk_with(&mut index, 1, None, |_| {}).unwrap(), 3);
    }

    #[test]
    fn limit_overrides_cycle_detection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = looping_index(tmp.path(), &[("a", &["1.png", "2.png"])]);

        assert_eq!(walk_with(&mut index, 1, Some(5), |_| {}).unwrap(), 5);
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
