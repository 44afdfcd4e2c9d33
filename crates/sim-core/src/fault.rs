//! # fault
//!
//! why: one crash/recover surface over both ring nodes and acceptors
//! relations: dispatches to topology.rs and paxos.rs liveness toggles
//! what: FaultTarget enum, crash/recover entry points

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SimError;
use crate::paxos::PaxosState;
use crate::topology::Ring;

/// What a fault-injection command points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultTarget {
    /// A ring node by id
    Node(u64),
    /// An acceptor by name
    Acceptor(String),
}

impl fmt::Display for FaultTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultTarget::Node(id) => write!(f, "node {id}"),
            FaultTarget::Acceptor(name) => write!(f, "acceptor {name}"),
        }
    }
}

/// Mark the target dead; stale election or promise state stays in place
pub fn crash(ring: &mut Ring, paxos: &mut PaxosState, target: &FaultTarget) -> Result<(), SimError> {
    match target {
        FaultTarget::Node(id) => ring.crash(*id)?,
        FaultTarget::Acceptor(name) => paxos.crash(name)?,
    }
    info!(%target, "crashed");
    Ok(())
}

/// Mark the target alive again with whatever state it had when it went down
pub fn recover(
    ring: &mut Ring,
    paxos: &mut PaxosState,
    target: &FaultTarget,
) -> Result<(), SimError> {
    match target {
        FaultTarget::Node(id) => ring.recover(*id)?,
        FaultTarget::Acceptor(name) => paxos.recover(name)?,
    }
    info!(%target, "recovered");
    Ok(())
}
