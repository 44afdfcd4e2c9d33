//! # topology
//!
//! why: model the fixed ring of logical nodes that elections run over
//! relations: election.rs walks it, fault.rs toggles alive flags on it
//! what: Node struct, Ring with successor/next-alive lookup, crash/recover

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// One logical node in the ring
///
/// Crash is a flag, not removal: a dead node keeps its identity and whatever
/// stale `participant`/`elected` state it had when it went down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique, totally ordered id
    pub id: u64,
    pub alive: bool,
    /// True while this node is forwarding an in-flight election
    pub participant: bool,
    /// Last leader id this node learned, if any
    pub elected: Option<u64>,
}

impl Node {
    fn new(id: u64) -> Self {
        Self {
            id,
            alive: true,
            participant: false,
            elected: None,
        }
    }
}

/// The ordered ring of nodes plus the currently known leader
///
/// Nodes are held sorted by id in a plain vector; the successor relation is
/// positional (next index mod n), so there are no linked node references.
#[derive(Debug, Clone)]
pub struct Ring {
    nodes: Vec<Node>,
    /// Last elected leader; not eagerly cleared when that node crashes,
    /// callers validate through [`Ring::leader`] before relying on it
    pub leader_id: Option<u64>,
}

impl Ring {
    /// Build a ring from the given ids (sorted, deduplicated), all alive
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut ids: Vec<u64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            nodes: ids.into_iter().map(Node::new).collect(),
            leader_id: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn contains(&self, id: u64) -> bool {
        self.position(id).is_some()
    }

    pub fn node(&self, id: u64) -> Option<&Node> {
        self.position(id).map(|i| &self.nodes[i])
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.nodes.binary_search_by_key(&id, |n| n.id).ok()
    }

    fn node_mut(&mut self, id: u64) -> Result<&mut Node, SimError> {
        let pos = self
            .position(id)
            .ok_or_else(|| SimError::InvalidTarget(format!("node {id}")))?;
        Ok(&mut self.nodes[pos])
    }

    /// The next node clockwise, dead or alive
    pub fn successor(&self, id: u64) -> Result<u64, SimError> {
        let pos = self
            .position(id)
            .ok_or_else(|| SimError::InvalidTarget(format!("node {id}")))?;
        Ok(self.nodes[(pos + 1) % self.nodes.len()].id)
    }

    /// Walk successors skipping dead nodes; wraps at most once around
    pub fn next_alive(&self, id: u64) -> Result<u64, SimError> {
        let mut cur = self.successor(id)?;
        for _ in 0..self.nodes.len() {
            if self.node(cur).is_some_and(|n| n.alive) {
                return Ok(cur);
            }
            cur = self.successor(cur)?;
        }
        Err(SimError::NoAliveSuccessor(id))
    }

    pub fn alive_ids(&self) -> Vec<u64> {
        self.nodes.iter().filter(|n| n.alive).map(|n| n.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// The current leader, only if that node is still alive
    ///
    /// This is the lazy validation point for `leader_id`: a crash never
    /// clears the field, it just stops passing this check.
    pub fn leader(&self) -> Option<u64> {
        self.leader_id
            .filter(|id| self.node(*id).is_some_and(|n| n.alive))
    }

    pub fn crash(&mut self, id: u64) -> Result<(), SimError> {
        self.node_mut(id)?.alive = false;
        Ok(())
    }

    pub fn recover(&mut self, id: u64) -> Result<(), SimError> {
        self.node_mut(id)?.alive = true;
        Ok(())
    }

    pub(crate) fn set_participant(&mut self, id: u64, flag: bool) -> Result<(), SimError> {
        self.node_mut(id)?.participant = flag;
        Ok(())
    }

    pub(crate) fn set_elected(&mut self, id: u64, leader: u64) -> Result<(), SimError> {
        let node = self.node_mut(id)?;
        node.elected = Some(leader);
        node.participant = false;
        Ok(())
    }

    /// Clear participant/elected/leader, preserving alive flags
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.participant = false;
            node.elected = None;
        }
        self.leader_id = None;
    }
}
