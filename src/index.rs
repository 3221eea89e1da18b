//! Single-cursor façade over the node store.
//!
//! [`PathIndex::seek`] moves through the whole collection as if it were
//! one flat list: intra-node seeks go to the current [`PathNode`], and
//! crossing a node boundary advances the store, skips nodes that turn out
//! empty, lands on the near edge of the next node and only then releases
//! the node that was left.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::discover::discover;
use crate::error::{Error, Result};
use crate::node::{Direction, Member, PathNode, SeekOutcome, Whence};
use crate::store::{PathNodeStore, StoreMove};

/// Why a non-looping traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReason {
    /// Moved forward past the last member of the last node.
    EndOfCollection,
    /// Moved backward before the first member of the first node.
    StartOfCollection,
}

impl From<Direction> for BoundaryReason {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => BoundaryReason::EndOfCollection,
            Direction::Backward => BoundaryReason::StartOfCollection,
        }
    }
}

impl std::fmt::Display for BoundaryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryReason::EndOfCollection => f.write_str("end of collection"),
            BoundaryReason::StartOfCollection => f.write_str("start of collection"),
        }
    }
}

/// Outcome of a façade seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Moved,
    /// The collection is exhausted; the boundary callback has been invoked.
    Terminated(BoundaryReason),
}

pub type BoundaryCallback = Box<dyn FnMut(BoundaryReason) + Send>;

/// The index shared between a UI thread and its workers. Hold the lock
/// around every seek/populate/unpopulate sequence.
pub type SharedIndex = Arc<Mutex<PathIndex>>;

/// Where to put the cursor in a node reached by crossing a boundary.
#[derive(Debug, Clone, Copy)]
enum Landing {
    /// First member going forward, last member going backward.
    NearEdge,
    /// Always the first member.
    First,
}

pub struct PathIndex {
    store: PathNodeStore,
    config: Arc<IndexConfig>,
    on_boundary: BoundaryCallback,
}

impl PathIndex {
    pub fn new(
        store: PathNodeStore,
        config: Arc<IndexConfig>,
        on_boundary: impl FnMut(BoundaryReason) + Send + 'static,
    ) -> Self {
        Self {
            store,
            config,
            on_boundary: Box::new(on_boundary),
        }
    }

    /// Discover nodes for `paths`, build the store and position the cursor
    /// on the first displayable member.
    pub fn open(
        paths: &[PathBuf],
        config: Arc<IndexConfig>,
        on_boundary: impl FnMut(BoundaryReason) + Send + 'static,
    ) -> Result<Self> {
        let nodes = discover(paths, &config)?;
        info!(nodes = nodes.len(), "sources registered");
        let store = PathNodeStore::from_nodes(nodes, config.loop_mode);
        let mut index = Self::new(store, config, on_boundary);
        index.start()?;
        Ok(index)
    }

    pub fn into_shared(self) -> SharedIndex {
        Arc::new(Mutex::new(self))
    }

    /// Populate the first non-empty node.
    pub fn start(&mut self) -> Result<()> {
        self.store.seek_first_pathnode(0)?;
        self.preaccess();
        Ok(())
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn store(&self) -> &PathNodeStore {
        &self.store
    }

    pub fn current_node(&self) -> Option<&PathNode> {
        self.store.current_node()
    }

    /// `(node index, position in node)`; the position is `None` while the
    /// current node is unpopulated.
    pub fn cursor(&self) -> (usize, Option<usize>) {
        (
            self.store.current_index(),
            self.store.current_node().and_then(PathNode::position),
        )
    }

    /// The member the cursor is on, for display.
    pub fn current_item(&self) -> Option<&Member> {
        self.store.current_node()?.current()
    }

    /// Move through the collection.
    ///
    /// Returns [`Traversal::Terminated`] (after invoking the boundary
    /// callback) when a non-looping traversal runs off either end; the
    /// cursor then stays where it was.
    pub fn seek(&mut self, offset: isize, whence: Whence) -> Result<Traversal> {
        let node = self.store.current_node_mut().ok_or(Error::NoSources)?;
        match node.seek(offset, whence)? {
            SeekOutcome::Moved => {
                self.preaccess();
                Ok(Traversal::Moved)
            }
            SeekOutcome::Boundary {
                direction,
                overflow,
            } => {
                debug!(?direction, overflow, "node boundary");
                self.cross(direction, Landing::NearEdge)
            }
        }
    }

    /// Jump to the first member of the next node.
    pub fn pathnode_seek_next(&mut self) -> Result<Traversal> {
        self.ensure_started()?;
        self.cross(Direction::Forward, Landing::First)
    }

    /// Jump to the first member of the previous node.
    pub fn pathnode_seek_previous(&mut self) -> Result<Traversal> {
        self.ensure_started()?;
        self.cross(Direction::Backward, Landing::First)
    }

    fn ensure_started(&self) -> Result<()> {
        match self.store.current_node() {
            Some(node) if node.is_populated() => Ok(()),
            Some(_) => Err(Error::NotPopulated),
            None => Err(Error::NoSources),
        }
    }

    /// Advance the store one node at a time in `direction` until a
    /// non-empty node is reached, at most once around the collection.
    fn cross(&mut self, direction: Direction, landing: Landing) -> Result<Traversal> {
        let left = self.store.current_index();

        for _ in 0..self.store.len() {
            match self.store.seek(direction.step()) {
                StoreMove::Boundary(_) => {
                    self.store.restore_cursor(left);
                    return Ok(self.terminate(direction.into()));
                }
                StoreMove::Stayed => {
                    self.land(direction, landing)?;
                    return Ok(Traversal::Moved);
                }
                StoreMove::Moved { wrapped } => {
                    let populated = self
                        .store
                        .current_node()
                        .is_some_and(PathNode::is_populated);
                    if !populated {
                        debug!(index = self.store.current_index(), "skipping empty node");
                        continue;
                    }

                    self.land(direction, landing)?;
                    let reached = self.store.current_index();
                    if reached != left {
                        if let Some(node) = self.store.node_mut(left) {
                            node.unpopulate();
                        }
                    }
                    if let Some(node) = self.store.current_node() {
                        info!(node = %node, wrapped, "entered node");
                    }
                    return Ok(Traversal::Moved);
                }
            }
        }

        Err(Error::AllNodesEmpty {
            count: self.store.len(),
        })
    }

    fn land(&mut self, direction: Direction, landing: Landing) -> Result<()> {
        let node = self.store.current_node_mut().ok_or(Error::NoSources)?;
        match (landing, direction) {
            (Landing::NearEdge, Direction::Backward) => node.seek_last()?,
            _ => node.seek_first()?,
        }
        self.preaccess();
        Ok(())
    }

    fn terminate(&mut self, reason: BoundaryReason) -> Traversal {
        info!(%reason, "traversal terminated");
        (self.on_boundary)(reason);
        Traversal::Terminated(reason)
    }

    fn preaccess(&self) {
        if !self.config.preaccess {
            return;
        }
        if let Some(node) = self.store.current_node() {
            if let Err(err) = node.preaccess_current() {
                warn!(node = %node, error = %err, "preaccess failed");
            }
        }
    }
}

impl std::fmt::Debug for PathIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathIndex")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
