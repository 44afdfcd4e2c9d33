//! # election
//!
//! why: run chang-roberts leader election as a replayable step sequence
//! relations: mutates topology.rs ring state, steps consumed by sim-session
//! what: ElectionStep/Compare step records, run_traced/run_fast entry points

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::topology::Ring;

/// Outcome of comparing the carried candidate id `j` against the recipient
///
/// Serialized labels are the exact strings the visualization client
/// pattern-matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compare {
    /// j < recipient id and the recipient was not yet a participant:
    /// the candidate is replaced by the recipient's own id
    #[serde(rename = "j<me & non-participant")]
    LowerNonParticipant,
    /// j > recipient id: forwarded unchanged
    #[serde(rename = "j>me")]
    Higher,
    /// j < recipient id at a node already participating: swallowed
    #[serde(rename = "j<me & participant")]
    LowerParticipant,
}

/// One unit of protocol progress, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElectionStep {
    /// Initiator marks itself participant and sends its own id
    Start { who: u64 },
    /// ELECTION(j_in) delivered from `frm` to `to`
    Hop {
        frm: u64,
        to: u64,
        j_in: u64,
        compare: Compare,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
    },
    /// A node saw its own id come back and declared itself leader
    Winner { who: u64 },
    /// COORDINATOR(leader) forwarded from `frm` to `to`
    Coord { frm: u64, to: u64, leader: u64 },
    /// Coordinator message completed its circuit
    End { leader: u64 },
    /// The run could not proceed
    Error { reason: String },
}

/// The ordered steps of one election run
pub type Trace = Vec<ElectionStep>;

fn resolve_initiator(ring: &Ring, initiator: Option<u64>) -> Result<u64, SimError> {
    match initiator {
        Some(id) => {
            if ring.node(id).is_some_and(|n| n.alive) {
                Ok(id)
            } else {
                Err(SimError::InvalidTarget(format!("initiator {id}")))
            }
        }
        None => ring
            .alive_ids()
            .first()
            .copied()
            .ok_or(SimError::NoAliveNodes),
    }
}

/// Run one full election, returning the ordered trace of every step
///
/// This is the single underlying state machine; fast and streamed modes are
/// just different deliveries of its output. Ring state is mutated as the
/// steps are produced, so the returned trace is already committed.
pub fn run_traced(ring: &mut Ring, initiator: Option<u64>) -> Result<Trace, SimError> {
    match ring.alive_count() {
        0 => return Err(SimError::NoAliveNodes),
        1 => return Err(SimError::InsufficientAliveNodes(1)),
        _ => {}
    }
    let start = resolve_initiator(ring, initiator)?;
    debug!(initiator = start, "election starting");

    let mut steps: Trace = Vec::new();
    ring.set_participant(start, true)?;
    steps.push(ElectionStep::Start { who: start });

    // circulate ELECTION(j); j only ever grows, so the loop is bounded by
    // two trips around the ring
    let mut j = start;
    let mut cur = start;
    let winner = loop {
        let to = ring.next_alive(cur)?;
        if to == j {
            // the message reached its own originator: self-return, not a hop
            steps.push(ElectionStep::Winner { who: j });
            break j;
        }
        let m = to;
        let participant = ring.node(to).is_some_and(|n| n.participant);
        if j < m && !participant {
            ring.set_participant(to, true)?;
            steps.push(ElectionStep::Hop {
                frm: cur,
                to,
                j_in: j,
                compare: Compare::LowerNonParticipant,
                action: Some(format!("replace-with-{m}")),
            });
            j = m;
        } else if j > m {
            ring.set_participant(to, true)?;
            steps.push(ElectionStep::Hop {
                frm: cur,
                to,
                j_in: j,
                compare: Compare::Higher,
                action: None,
            });
        } else {
            // j < m at a participant: swallowed, nothing forwarded.
            // unreachable with a single initiator but part of the protocol.
            steps.push(ElectionStep::Hop {
                frm: cur,
                to,
                j_in: j,
                compare: Compare::LowerParticipant,
                action: None,
            });
            return Ok(steps);
        }
        cur = to;
    };

    ring.leader_id = Some(winner);
    debug!(leader = winner, "election winner declared");

    // coordinator broadcast: full circuit back to the winner, every alive
    // node (the winner included, on the closing edge) learns the leader
    let mut cur = winner;
    loop {
        let to = ring.next_alive(cur)?;
        ring.set_elected(to, winner)?;
        steps.push(ElectionStep::Coord {
            frm: cur,
            to,
            leader: winner,
        });
        if to == winner {
            break;
        }
        cur = to;
    }
    steps.push(ElectionStep::End { leader: winner });
    debug!(leader = winner, steps = steps.len(), "election complete");
    Ok(steps)
}

/// Run the same state machine to completion without retaining the trace
pub fn run_fast(ring: &mut Ring, initiator: Option<u64>) -> Result<(), SimError> {
    run_traced(ring, initiator).map(|_| ())
}
