//! # api
//!
//! why: define the JSON snapshot shapes the visualization client polls
//! relations: built from sim-core state by session.rs
//! what: ring/paxos state views, trace and propose responses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sim_core::{Acceptor, ElectionStep, Node, PaxosState, Ring};

/// One ring node as the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: u64,
    pub alive: bool,
    pub participant: bool,
    pub elected: Option<u64>,
}

impl From<&Node> for NodeView {
    fn from(n: &Node) -> Self {
        Self {
            id: n.id,
            alive: n.alive,
            participant: n.participant,
            elected: n.elected,
        }
    }
}

/// The ring half of the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingStateView {
    pub leader_id: Option<u64>,
    pub nodes: Vec<NodeView>,
}

impl RingStateView {
    pub fn of(ring: &Ring) -> Self {
        Self {
            leader_id: ring.leader_id,
            nodes: ring.nodes().iter().map(NodeView::from).collect(),
        }
    }
}

/// The highest-slot value an acceptor has accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedView {
    pub slot: u64,
    pub ballot: u64,
    pub value: String,
}

/// One acceptor card: name, liveness, promise, latest accepted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptorView {
    pub name: String,
    pub alive: bool,
    pub promised: u64,
    pub accepted: Option<AcceptedView>,
}

impl From<&Acceptor> for AcceptorView {
    fn from(a: &Acceptor) -> Self {
        Self {
            name: a.name.clone(),
            alive: a.alive,
            promised: a.promised,
            accepted: a.latest_accepted().map(|(slot, ballot, value)| AcceptedView {
                slot,
                ballot,
                value: value.to_string(),
            }),
        }
    }
}

/// The paxos half of the simulation; `consistent` is recomputed on read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaxosStateView {
    pub commit_index: Option<u64>,
    pub consistent: bool,
    pub majority: usize,
    pub acceptors: Vec<AcceptorView>,
    pub log: BTreeMap<u64, String>,
}

impl PaxosStateView {
    pub fn of(paxos: &PaxosState) -> Self {
        Self {
            commit_index: paxos.commit_index(),
            consistent: paxos.consistent(),
            majority: paxos.majority(),
            acceptors: paxos.acceptors().iter().map(AcceptorView::from).collect(),
            log: paxos.log().clone(),
        }
    }
}

/// A completed traced election: the full ordered step sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceView {
    pub steps: Vec<ElectionStep>,
    /// None only for a trace that terminated without a winner
    pub leader_id: Option<u64>,
}

/// The updated half of the simulation a fault command touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FaultView {
    Ring(RingStateView),
    Paxos(PaxosStateView),
}

/// A successful proposal: what was chosen, where, and by whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeView {
    pub slot: u64,
    pub chosen: String,
    pub proposer: u64,
}
