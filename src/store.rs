//! Ordered collection of nodes and the node-level cursor.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::node::{Direction, PathNode};

/// Result of moving the store cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMove {
    /// The cursor moved to another node, wrapping around when `wrapped`.
    Moved { wrapped: bool },
    /// Loop mode with a single node: the overflow was absorbed in place.
    Stayed,
    /// Non-loop mode: the move would leave the collection.
    Boundary(Direction),
}

/// Sequence of [`PathNode`]s with a current-node cursor.
///
/// The store populates the node it moves to but never unpopulates the node
/// it leaves; the caller does that once the transition is confirmed.
#[derive(Debug)]
pub struct PathNodeStore {
    nodes: Vec<PathNode>,
    current: usize,
    loop_mode: bool,
}

impl PathNodeStore {
    pub fn new(loop_mode: bool) -> Self {
        Self {
            nodes: Vec::new(),
            current: 0,
            loop_mode,
        }
    }

    pub fn from_nodes(nodes: Vec<PathNode>, loop_mode: bool) -> Self {
        Self {
            nodes,
            current: 0,
            loop_mode,
        }
    }

    pub fn push(&mut self, node: PathNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn loop_mode(&self) -> bool {
        self.loop_mode
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_node(&self) -> Option<&PathNode> {
        self.nodes.get(self.current)
    }

    pub fn current_node_mut(&mut self) -> Option<&mut PathNode> {
        self.nodes.get_mut(self.current)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut PathNode> {
        self.nodes.get_mut(index)
    }

    /// Put the cursor back on a node without populating it.
    pub(crate) fn restore_cursor(&mut self, index: usize) {
        if index < self.nodes.len() {
            self.current = index;
        }
    }

    /// Make the first non-empty node at or after `offset` current.
    ///
    /// # Errors
    ///
    /// [`Error::NoSources`] on an empty store, [`Error::AllNodesEmpty`] when
    /// no node from `offset` on holds a displayable member.
    pub fn seek_first_pathnode(&mut self, offset: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::NoSources);
        }

        for index in offset..self.nodes.len() {
            self.current = index;
            if self.populate_current() {
                debug!(index, "first non-empty node");
                return Ok(());
            }
        }

        Err(Error::AllNodesEmpty {
            count: self.nodes.len(),
        })
    }

    /// Make the last node current. Does not populate it.
    pub fn seek_last_pathnode(&mut self) {
        self.current = self.nodes.len().saturating_sub(1);
    }

    /// Move the cursor by `offset` nodes and populate the node reached.
    ///
    /// Whether that node turned out empty is visible through
    /// [`PathNode::is_populated`] on the new current node.
    pub fn seek(&mut self, offset: isize) -> StoreMove {
        let len = self.nodes.len() as isize;
        let direction = if offset < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        };
        if len == 0 {
            return StoreMove::Boundary(direction);
        }

        let target = self.current as isize + offset;
        let (target, wrapped) = if (0..len).contains(&target) {
            (target, false)
        } else if !self.loop_mode {
            debug!(?direction, "store boundary");
            return StoreMove::Boundary(direction);
        } else if len == 1 {
            return StoreMove::Stayed;
        } else {
            (target.rem_euclid(len), true)
        };

        self.current = target as usize;
        if wrapped {
            debug!(index = self.current, "store wrapped around");
        }
        self.populate_current();
        StoreMove::Moved { wrapped }
    }

    /// Populate the current node, treating a failed scan as an empty node.
    /// Nodes already known to be empty are not scanned again.
    fn populate_current(&mut self) -> bool {
        let Some(node) = self.nodes.get_mut(self.current) else {
            return false;
        };
        if let Err(err) = node.populate() {
            warn!(node = %node, error = %err, "failed to populate, skipping");
            node.mark_empty();
            return false;
        }
        node.is_populated()
    }
}

impl Drop for PathNodeStore {
    fn drop(&mut self) {
        for node in &mut self.nodes {
            node.unpopulate();
        }
    }
}
