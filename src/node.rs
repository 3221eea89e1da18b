//! One traversable content source: a directory or an archive.
//!
//! A node is created cheap (no I/O beyond validating its path) and only
//! scanned when [`PathNode::populate`] is called, usually when the cursor
//! enters it. Archive nodes own a private cache directory for as long as
//! they are populated; [`PathNode::unpopulate`] removes it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::{ArchiveBackend, ArchiveFormat};
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::item::ContentItem;
use crate::types::is_ignored_member;

/// Seek reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute index.
    Set,
    /// Relative to the current position.
    Cur,
    /// Relative to the end (`End, -1` is the last member).
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Result of a seek inside one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The cursor moved (or stayed) inside the node.
    Moved,
    /// The target lies outside the node. `overflow` counts the positions
    /// past the first out-of-range slot: 0 means "just past the end" or
    /// "just before the start".
    Boundary { direction: Direction, overflow: usize },
}

/// Whether a node is known to hold displayable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emptiness {
    #[default]
    Unknown,
    NonEmpty,
    Empty,
}

/// What kind of source a node reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Archive(ArchiveFormat),
}

impl NodeKind {
    /// Pick the node kind handling `path`: directories, then archives by extension.
    pub fn for_path(path: &Path) -> Option<Self> {
        if path.is_dir() {
            Some(NodeKind::Directory)
        } else {
            ArchiveFormat::from_path(path).map(NodeKind::Archive)
        }
    }

    fn label(&self) -> &'static str {
        match self {
            NodeKind::Directory => "Dir",
            NodeKind::Archive(format) => format.label(),
        }
    }
}

/// One entry of a populated node.
#[derive(Debug, Clone)]
pub enum Member {
    /// A plain file of a directory node.
    File(PathBuf),
    /// A lazily-extracted archive member.
    Archived(Arc<ContentItem>),
}

impl Member {
    /// Filesystem path for decoders: the file itself or the member's cache file.
    pub fn path(&self) -> &Path {
        match self {
            Member::File(path) => path,
            Member::Archived(item) => item.extracted_path(),
        }
    }

    /// Human-facing name: full path for files, member name for archives.
    pub fn name(&self) -> String {
        match self {
            Member::File(path) => path.display().to_string(),
            Member::Archived(item) => item.member_name().to_string(),
        }
    }

    pub fn as_item(&self) -> Option<&Arc<ContentItem>> {
        match self {
            Member::File(_) => None,
            Member::Archived(item) => Some(item),
        }
    }

    /// Whole content, extracting archive members on first access.
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            Member::File(path) => Ok(fs::read(path)?),
            Member::Archived(item) => item.read(None),
        }
    }

    fn release(&self) {
        if let Member::Archived(item) = self {
            if item.is_used() || item.is_materialized() {
                item.close();
            }
        }
    }
}

/// Compute the target index of a seek, or where it falls outside `0..len`.
pub(crate) fn resolve_seek(
    position: usize,
    len: usize,
    offset: isize,
    whence: Whence,
) -> std::result::Result<usize, (Direction, usize)> {
    let offset = offset as i128;
    let candidate = match whence {
        Whence::Set => offset,
        Whence::Cur => position as i128 + offset,
        Whence::End => len as i128 + offset,
    };

    if candidate >= len as i128 {
        Err((Direction::Forward, (candidate - len as i128) as usize))
    } else if candidate < 0 {
        Err((Direction::Backward, (-candidate - 1) as usize))
    } else {
        Ok(candidate as usize)
    }
}

/// A directory or archive with an ordered list of displayable members.
pub struct PathNode {
    kind: NodeKind,
    uri: PathBuf,
    start: Option<PathBuf>,
    config: Arc<IndexConfig>,
    backend: Option<Arc<dyn ArchiveBackend>>,
    members: Option<Vec<Member>>,
    position: usize,
    emptiness: Emptiness,
    cache_dir: Option<TempDir>,
}

impl PathNode {
    /// Create a node of `kind` for `uri`.
    ///
    /// A directory node may be given a file path: it then covers the
    /// containing directory and starts on that file.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSource`] when `uri` does not exist or does not fit
    /// `kind` (a directory node on something that is neither file nor
    /// directory, an archive node on a directory).
    pub fn create(kind: NodeKind, uri: impl Into<PathBuf>, config: Arc<IndexConfig>) -> Result<Self> {
        let uri = uri.into();
        let (uri, start) = match kind {
            NodeKind::Directory if uri.is_dir() => (uri, None),
            NodeKind::Directory if uri.is_file() => {
                let parent = uri
                    .parent()
                    .map(Path::to_path_buf)
                    .ok_or_else(|| Error::InvalidSource(uri.clone()))?;
                (parent, Some(uri))
            }
            NodeKind::Archive(_) if uri.is_file() => (uri, None),
            _ => return Err(Error::InvalidSource(uri)),
        };

        Ok(Self {
            kind,
            uri,
            start,
            config,
            backend: None,
            members: None,
            position: 0,
            emptiness: Emptiness::Unknown,
            cache_dir: None,
        })
    }

    /// Archive node reading through an already-opened backend instead of
    /// opening `uri` by format.
    pub fn with_backend(
        format: ArchiveFormat,
        uri: impl Into<PathBuf>,
        backend: Arc<dyn ArchiveBackend>,
        config: Arc<IndexConfig>,
    ) -> Self {
        Self {
            kind: NodeKind::Archive(format),
            uri: uri.into(),
            start: None,
            config,
            backend: Some(backend),
            members: None,
            position: 0,
            emptiness: Emptiness::Unknown,
            cache_dir: None,
        }
    }

    /// Start on this member (a file path for directories, a member name for
    /// archives) when it survives filtering.
    pub fn with_start(mut self, start: impl Into<PathBuf>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn uri(&self) -> &Path {
        &self.uri
    }

    pub fn start(&self) -> Option<&Path> {
        self.start.as_deref()
    }

    pub fn is_populated(&self) -> bool {
        self.members.is_some()
    }

    pub fn emptiness(&self) -> Emptiness {
        self.emptiness
    }

    /// Known to hold no displayable member.
    pub fn is_empty(&self) -> bool {
        self.emptiness == Emptiness::Empty
    }

    /// Member count, 0 while unpopulated.
    pub fn len(&self) -> usize {
        self.members.as_ref().map_or(0, Vec::len)
    }

    pub fn members(&self) -> &[Member] {
        self.members.as_deref().unwrap_or(&[])
    }

    pub fn position(&self) -> Option<usize> {
        self.members.as_ref().map(|_| self.position)
    }

    pub fn current(&self) -> Option<&Member> {
        self.members.as_ref()?.get(self.position)
    }

    /// Extraction directory, present only while an archive node is populated.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_ref().map(TempDir::path)
    }

    /// Scan the source and resolve the current member.
    ///
    /// Does nothing when already populated or already known to be empty.
    /// When no member survives filtering the node stays unpopulated and is
    /// marked [`Emptiness::Empty`]; that is not an error.
    pub fn populate(&mut self) -> Result<()> {
        if self.is_populated() || self.is_empty() {
            return Ok(());
        }
        debug!(node = %self, "populating");

        let (members, cache_dir) = match self.kind {
            NodeKind::Directory => (self.scan_directory()?, None),
            NodeKind::Archive(format) => {
                let (members, dir) = self.scan_archive(format)?;
                (members, Some(dir))
            }
        };

        if members.is_empty() {
            debug!(node = %self, "no supported members");
            self.emptiness = Emptiness::Empty;
            if let Some(dir) = cache_dir {
                close_cache_dir(dir);
            }
            return Ok(());
        }

        self.position = self
            .start
            .as_deref()
            .and_then(|start| members.iter().position(|m| member_matches(m, start)))
            .unwrap_or(0);
        self.members = Some(members);
        self.cache_dir = cache_dir;
        self.emptiness = Emptiness::NonEmpty;

        debug!(node = %self, "populated");
        Ok(())
    }

    fn scan_directory(&self) -> Result<Vec<Member>> {
        if !self.uri.is_dir() {
            return Err(Error::InvalidSource(self.uri.clone()));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.uri)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.into_path()),
                Err(err) => {
                    warn!(dir = %self.uri.display(), error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|path| path.is_file() && self.config.supported.is_supported(path))
            .collect();
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        Ok(files.into_iter().map(Member::File).collect())
    }

    fn scan_archive(&self, format: ArchiveFormat) -> Result<(Vec<Member>, TempDir)> {
        fs::create_dir_all(&self.config.cache_root)?;
        let cache_dir = tempfile::Builder::new()
            .prefix(&format!("pathnodes_PNA{}_", format.label()))
            .suffix(".tmp")
            .tempdir_in(&self.config.cache_root)?;

        let backend = match &self.backend {
            Some(backend) => backend.clone(),
            None => format.open(&self.uri, &self.config)?,
        };

        let mut names: Vec<String> = backend
            .list_members()?
            .into_iter()
            .filter(|name| !is_ignored_member(name) && self.config.supported.is_supported(name))
            .collect();
        names.sort();
        names.dedup();

        let members = names
            .into_iter()
            .map(|name| {
                Member::Archived(Arc::new(ContentItem::new(
                    backend.clone(),
                    cache_dir.path(),
                    name,
                )))
            })
            .collect();

        Ok((members, cache_dir))
    }

    /// Record that the source cannot be scanned, so it is skipped from now on.
    pub(crate) fn mark_empty(&mut self) {
        self.emptiness = Emptiness::Empty;
    }

    /// Release every extracted member and the cache directory, and forget
    /// the member list. Safe to call on an unpopulated node.
    pub fn unpopulate(&mut self) {
        let Some(members) = self.members.take() else {
            return;
        };
        debug!(node = %self, "unpopulating");

        for member in &members {
            member.release();
        }
        if let Some(dir) = self.cache_dir.take() {
            close_cache_dir(dir);
        }
        self.position = 0;
    }

    /// Extract the current member now, for callers that need early access.
    pub fn preaccess_current(&self) -> Result<()> {
        match self.current() {
            Some(Member::Archived(item)) => item.uncompress_file_if_needed().map(|_| ()),
            Some(Member::File(_)) => Ok(()),
            None => Err(Error::NotPopulated),
        }
    }

    /// Move the cursor inside this node.
    ///
    /// A target outside the member list leaves the cursor where it was and
    /// returns [`SeekOutcome::Boundary`].
    pub fn seek(&mut self, offset: isize, whence: Whence) -> Result<SeekOutcome> {
        let len = self.len();
        if !self.is_populated() {
            return Err(Error::NotPopulated);
        }

        match resolve_seek(self.position, len, offset, whence) {
            Ok(target) => {
                self.move_to(target);
                Ok(SeekOutcome::Moved)
            }
            Err((direction, overflow)) => Ok(SeekOutcome::Boundary {
                direction,
                overflow,
            }),
        }
    }

    pub fn seek_first(&mut self) -> Result<()> {
        if !self.is_populated() {
            return Err(Error::NotPopulated);
        }
        self.move_to(0);
        Ok(())
    }

    pub fn seek_last(&mut self) -> Result<()> {
        if !self.is_populated() {
            return Err(Error::NotPopulated);
        }
        self.move_to(self.len() - 1);
        Ok(())
    }

    fn move_to(&mut self, target: usize) {
        if target == self.position {
            return;
        }
        if let Some(previous) = self.current() {
            previous.release();
        }
        self.position = target;
    }
}

fn member_matches(member: &Member, start: &Path) -> bool {
    match member {
        Member::File(path) => path == start,
        Member::Archived(item) => Path::new(item.member_name()) == start,
    }
}

fn close_cache_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        warn!(path = %path.display(), error = %err, "failed to remove cache directory");
    }
}

impl Drop for PathNode {
    fn drop(&mut self) {
        self.unpopulate();
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathNode{}({}", self.kind.label(), self.uri.display())?;
        if let Some(member) = self.current() {
            write!(f, ", {}/{} {}", self.position + 1, self.len(), member.name())?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathNode")
            .field("kind", &self.kind)
            .field("uri", &self.uri)
            .field("start", &self.start)
            .field("len", &self.len())
            .field("position", &self.position())
            .field("emptiness", &self.emptiness)
            .finish_non_exhaustive()
    }
}
