//! # error
//!
//! why: one recoverable failure taxonomy for every engine operation
//! relations: returned by topology.rs, election.rs, paxos.rs, fault.rs
//! what: SimError enum, PaxosPhase marker for quorum failures

use thiserror::Error;

/// Which paxos phase failed to gather a majority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaxosPhase {
    Prepare,
    Accept,
}

impl std::fmt::Display for PaxosPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaxosPhase::Prepare => write!(f, "prepare"),
            PaxosPhase::Accept => write!(f, "accept"),
        }
    }
}

/// Every way a simulation operation can fail
///
/// None of these are fatal: the caller can retry after recovering nodes,
/// re-running an election, or fixing the request. A failed operation leaves
/// ring and paxos state exactly as it found them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Election requested with zero alive ring nodes
    #[error("no alive nodes in the ring")]
    NoAliveNodes,

    /// Election requested with fewer than two alive ring nodes
    #[error("only {0} alive node(s); an election needs at least two")]
    InsufficientAliveNodes(usize),

    /// Successor walk wrapped the whole ring without finding a live node
    #[error("no alive successor reachable from node {0}")]
    NoAliveSuccessor(u64),

    /// A paxos phase fell short of a majority of the configured acceptor set
    #[error("no quorum in {phase} phase: {got} of {need} required")]
    NoQuorum {
        phase: PaxosPhase,
        got: usize,
        need: usize,
    },

    /// Crash/recover/initiate referencing an unknown node id or acceptor name
    #[error("unknown target: {0}")]
    InvalidTarget(String),

    /// Propose called with an empty command payload
    #[error("empty command")]
    EmptyCommand,
}
