//! # paxos
//!
//! why: append chosen values to a replicated log via single-decree-per-slot
//! paxos over a fixed, named acceptor set
//! relations: fault.rs toggles acceptor liveness, sim-session drives propose
//! what: Acceptor promise/accept state, PaxosState log + two-phase propose

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PaxosPhase, SimError};

/// One named consensus acceptor
///
/// Identity is the name and never changes; crash/recover only toggles
/// `alive`. Promises and accepted values survive a crash, which is what
/// keeps recovery safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptor {
    pub name: String,
    pub alive: bool,
    /// Highest ballot promised, 0 if none (ballots start at 1)
    pub promised: u64,
    /// Per-slot accepted (ballot, value) pairs
    pub accepted: BTreeMap<u64, (u64, String)>,
}

impl Acceptor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alive: true,
            promised: 0,
            accepted: BTreeMap::new(),
        }
    }

    /// The accepted entry for the highest slot, if any
    pub fn latest_accepted(&self) -> Option<(u64, u64, &str)> {
        self.accepted
            .iter()
            .next_back()
            .map(|(slot, (ballot, value))| (*slot, *ballot, value.as_str()))
    }
}

/// A successfully chosen value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chosen {
    pub slot: u64,
    pub value: String,
}

/// The acceptor bank plus the replicated log it agrees on
#[derive(Debug, Clone)]
pub struct PaxosState {
    acceptors: Vec<Acceptor>,
    /// Single monotonic ballot counter, shared across proposer identities
    ballot_counter: u64,
    log: BTreeMap<u64, String>,
    /// Highest contiguously chosen slot; None until slot 0 is chosen
    commit_index: Option<u64>,
}

impl PaxosState {
    pub fn new<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            acceptors: names.into_iter().map(|n| Acceptor::new(n.as_ref())).collect(),
            ballot_counter: 0,
            log: BTreeMap::new(),
            commit_index: None,
        }
    }

    pub fn acceptors(&self) -> &[Acceptor] {
        &self.acceptors
    }

    pub fn log(&self) -> &BTreeMap<u64, String> {
        &self.log
    }

    pub fn commit_index(&self) -> Option<u64> {
        self.commit_index
    }

    /// Strict majority of the total configured set, not just the alive part
    pub fn majority(&self) -> usize {
        self.acceptors.len() / 2 + 1
    }

    fn acceptor_mut(&mut self, name: &str) -> Result<&mut Acceptor, SimError> {
        self.acceptors
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| SimError::InvalidTarget(format!("acceptor {name}")))
    }

    pub fn crash(&mut self, name: &str) -> Result<(), SimError> {
        self.acceptor_mut(name)?.alive = false;
        Ok(())
    }

    pub fn recover(&mut self, name: &str) -> Result<(), SimError> {
        self.acceptor_mut(name)?.alive = true;
        Ok(())
    }

    /// First slot with no chosen value; contiguous by construction
    pub fn next_slot(&self) -> u64 {
        self.commit_index.map_or(0, |c| c + 1)
    }

    /// Run both paxos phases for the next free slot
    ///
    /// Grants for each phase are evaluated before anything is mutated, so a
    /// NoQuorum failure leaves every acceptor, the log, and the commit index
    /// exactly as they were.
    pub fn propose(&mut self, command: &str, proposer: u64) -> Result<Chosen, SimError> {
        if command.trim().is_empty() {
            return Err(SimError::EmptyCommand);
        }
        let slot = self.next_slot();
        let ballot = self.ballot_counter + 1;
        let need = self.majority();
        debug!(proposer, slot, ballot, command, "propose");

        // phase 1: prepare / promise
        let promisers: Vec<usize> = self
            .acceptors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive && ballot > a.promised)
            .map(|(i, _)| i)
            .collect();
        if promisers.len() < need {
            debug!(got = promisers.len(), need, "prepare phase short of quorum");
            return Err(SimError::NoQuorum {
                phase: PaxosPhase::Prepare,
                got: promisers.len(),
                need,
            });
        }
        self.ballot_counter = ballot;
        let mut highest: Option<(u64, String)> = None;
        for &i in &promisers {
            let acc = &mut self.acceptors[i];
            acc.promised = ballot;
            if let Some((prior_ballot, prior_value)) = acc.accepted.get(&slot) {
                if highest.as_ref().map_or(true, |(b, _)| prior_ballot > b) {
                    highest = Some((*prior_ballot, prior_value.clone()));
                }
            }
        }

        // safety rule: adopt the highest-ballot value already accepted for
        // this slot, fall back to our own command otherwise
        let value = highest.map_or_else(|| command.to_string(), |(_, v)| v);

        // phase 2: accept / accepted
        let accepters: Vec<usize> = self
            .acceptors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive && ballot >= a.promised)
            .map(|(i, _)| i)
            .collect();
        if accepters.len() < need {
            debug!(got = accepters.len(), need, "accept phase short of quorum");
            return Err(SimError::NoQuorum {
                phase: PaxosPhase::Accept,
                got: accepters.len(),
                need,
            });
        }
        for &i in &accepters {
            let acc = &mut self.acceptors[i];
            acc.promised = ballot;
            acc.accepted.insert(slot, (ballot, value.clone()));
        }

        // chosen: a majority accepted the same (ballot, value) pair
        self.log.insert(slot, value.clone());
        while self.log.contains_key(&self.next_slot()) {
            self.commit_index = Some(self.next_slot());
        }
        info!(slot, value, proposer, "value chosen");
        Ok(Chosen { slot, value })
    }

    /// Derived, recomputed on every read: do the alive acceptors agree on
    /// every chosen slot they have an opinion about?
    pub fn consistent(&self) -> bool {
        for (slot, chosen) in &self.log {
            for acc in self.acceptors.iter().filter(|a| a.alive) {
                if let Some((_, value)) = acc.accepted.get(slot) {
                    if value != chosen {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Reinitialize promise/accept/log state, keeping identities and alive flags
    pub fn reset(&mut self) {
        for acc in &mut self.acceptors {
            acc.promised = 0;
            acc.accepted.clear();
        }
        self.ballot_counter = 0;
        self.log.clear();
        self.commit_index = None;
    }
}
