//! # sim-core
//!
//! why: implement ring leader election (chang-roberts) and single-decree
//! paxos as pure, replayable in-memory state machines
//! relations: used by sim-session for the coordinated simulation session
//! what: ring topology, election engine + step traces, acceptor bank,
//! paxos engine, fault injection, error taxonomy

pub mod election;
pub mod error;
pub mod fault;
pub mod paxos;
pub mod topology;

pub use election::{run_fast, run_traced, Compare, ElectionStep, Trace};
pub use error::{PaxosPhase, SimError};
pub use fault::FaultTarget;
pub use paxos::{Acceptor, Chosen, PaxosState};
pub use topology::{Node, Ring};
