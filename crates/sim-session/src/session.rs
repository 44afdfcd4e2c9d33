//! # session
//!
//! why: hold the single source of truth for one simulation and serialize
//! every mutating operation against it
//! relations: wraps sim-core's ring + paxos state behind a RwLock; hands
//! out api.rs views and stream.rs step streams
//! what: SimSession with election/propose/fault/reset/snapshot operations

use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use sim_core::{election, fault, FaultTarget, PaxosState, Ring, SimError};

use crate::api::{FaultView, PaxosStateView, ProposeView, RingStateView, TraceView};
use crate::stream::StepStream;

/// The default ring (seven nodes, like the seven-datacenter demo) and the
/// three-region acceptor bank
const DEFAULT_RING_IDS: [u64; 7] = [1, 2, 3, 4, 5, 6, 7];
const DEFAULT_ACCEPTORS: [&str; 3] = ["EU", "US", "APAC"];

struct SimState {
    ring: Ring,
    paxos: PaxosState,
}

/// One live simulation session
///
/// All state is owned here and never handed out mutably; mutating
/// operations take the write lock for their whole unit of work, so a crash
/// request can never interleave with an election half-way through a step.
/// Snapshots take the read lock and see a consistent cut.
pub struct SimSession {
    inner: RwLock<SimState>,
}

impl Default for SimSession {
    fn default() -> Self {
        Self::new(DEFAULT_RING_IDS, DEFAULT_ACCEPTORS)
    }
}

impl SimSession {
    pub fn new<S: AsRef<str>>(
        ring_ids: impl IntoIterator<Item = u64>,
        acceptor_names: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            inner: RwLock::new(SimState {
                ring: Ring::new(ring_ids),
                paxos: PaxosState::new(acceptor_names),
            }),
        }
    }

    // -- snapshots --

    pub fn ring_state(&self) -> RingStateView {
        RingStateView::of(&self.inner.read().ring)
    }

    pub fn paxos_state(&self) -> PaxosStateView {
        PaxosStateView::of(&self.inner.read().paxos)
    }

    // -- elections --

    /// Run an election to completion and return only the final ring state
    pub fn election_fast(&self, initiator: Option<u64>) -> Result<RingStateView, SimError> {
        let mut state = self.inner.write();
        election::run_fast(&mut state.ring, initiator)?;
        Ok(RingStateView::of(&state.ring))
    }

    /// Run an election and return the full ordered trace for replay
    pub fn election_traced(&self, initiator: Option<u64>) -> Result<TraceView, SimError> {
        let mut state = self.inner.write();
        let steps = election::run_traced(&mut state.ring, initiator)?;
        let leader_id = state.ring.leader_id;
        Ok(TraceView { steps, leader_id })
    }

    /// Run an election and hand back its steps for paced redelivery
    ///
    /// The run completes (and commits ring state) before this returns; the
    /// stream only controls delivery tempo, and a consumer dropping it
    /// early changes nothing about the outcome.
    pub fn election_streamed(&self, initiator: Option<u64>, delay: Duration) -> StepStream {
        let mut state = self.inner.write();
        match election::run_traced(&mut state.ring, initiator) {
            Ok(steps) => StepStream::new(steps, delay),
            Err(err) => StepStream::error(err.to_string()),
        }
    }

    // -- faults --

    /// Crash the target and return the updated half it lives in, all under
    /// one lock acquisition so the snapshot cannot include later mutations
    pub fn crash(&self, target: &FaultTarget) -> Result<FaultView, SimError> {
        let mut guard = self.inner.write();
        let state = &mut *guard;
        fault::crash(&mut state.ring, &mut state.paxos, target)?;
        Ok(touched_half(state, target))
    }

    /// Recover the target and return the updated half it lives in
    pub fn recover(&self, target: &FaultTarget) -> Result<FaultView, SimError> {
        let mut guard = self.inner.write();
        let state = &mut *guard;
        fault::recover(&mut state.ring, &mut state.paxos, target)?;
        Ok(touched_half(state, target))
    }

    // -- resets --

    /// Clear participant/elected/leader on every node, preserving liveness
    pub fn reset_ring(&self) -> RingStateView {
        let mut state = self.inner.write();
        state.ring.reset();
        RingStateView::of(&state.ring)
    }

    /// Reinitialize the paxos half, preserving acceptor identities
    pub fn reset_paxos(&self) -> PaxosStateView {
        let mut state = self.inner.write();
        state.paxos.reset();
        PaxosStateView::of(&state.paxos)
    }

    // -- proposals --

    /// Propose a command as the current leader, electing one first if the
    /// known leader is crashed or there has never been one
    pub fn propose(&self, command: &str) -> Result<ProposeView, SimError> {
        let mut guard = self.inner.write();
        let state = &mut *guard;
        let proposer = match state.ring.leader() {
            Some(id) => id,
            None => {
                info!("no alive leader, running election before propose");
                election::run_fast(&mut state.ring, None)?;
                // a completed election always leaves an alive leader
                state.ring.leader().ok_or(SimError::NoAliveNodes)?
            }
        };
        let chosen = state.paxos.propose(command, proposer)?;
        Ok(ProposeView {
            slot: chosen.slot,
            chosen: chosen.value,
            proposer,
        })
    }
}

fn touched_half(state: &SimState, target: &FaultTarget) -> FaultView {
    match target {
        FaultTarget::Node(_) => FaultView::Ring(RingStateView::of(&state.ring)),
        FaultTarget::Acceptor(_) => FaultView::Paxos(PaxosStateView::of(&state.paxos)),
    }
}
