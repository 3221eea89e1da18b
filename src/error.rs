//! Error types for node population, extraction and traversal.
//!
//! Reaching the end or start of a node or of the whole collection is not an
//! error; those outcomes are reported through [`SeekOutcome`](crate::SeekOutcome),
//! [`StoreMove`](crate::StoreMove) and [`Traversal`](crate::Traversal).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The archive could not be opened or listed.
    #[error("archive {}: {reason}", path.display())]
    Archive { path: PathBuf, reason: String },

    /// One member could not be extracted to the cache.
    #[error("failed to extract {member}: {reason}")]
    Extraction { member: String, reason: String },

    /// The external extraction program could not be run.
    #[error("failed to run {program}: {reason}")]
    ExtractionProgram { program: String, reason: String },

    /// The path is neither a file nor a directory.
    #[error("{} is neither a file nor a directory", .0.display())]
    InvalidSource(PathBuf),

    /// No node type handles this path.
    #[error("no node type supports {}", .0.display())]
    UnsupportedSource(PathBuf),

    #[error("node must be populated first")]
    NotPopulated,

    #[error("no source was registered")]
    NoSources,

    #[error("none of the {count} registered source(s) contained supported files")]
    AllNodesEmpty { count: usize },
}

impl Error {
    pub(crate) fn archive(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(member: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Extraction {
            member: member.into(),
            reason: reason.to_string(),
        }
    }
}
