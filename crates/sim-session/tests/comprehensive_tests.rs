//! # comprehensive session tests
//!
//! why: verify the coordinated session behaves like the client contract
//! says, including cross-engine policy and concurrent access
//! relations: tests sim-session over sim-core
//! what: snapshots, election modes, streaming, fault routing, auto-election

use std::sync::Arc;
use std::time::Duration;

use sim_core::{ElectionStep, FaultTarget, PaxosPhase, SimError};
use sim_session::{FaultView, SimSession};

fn session() -> SimSession {
    SimSession::new([1, 2, 3, 4, 5], ["EU", "US", "APAC"])
}

// =============================================================================
// SECTION 1: SNAPSHOT TESTS
// =============================================================================

mod snapshots {
    use super::*;

    #[test]
    fn fresh_session_has_no_leader_and_empty_log() {
        let s = session();
        let ring = s.ring_state();
        assert_eq!(ring.leader_id, None);
        assert_eq!(ring.nodes.len(), 5);
        assert!(ring.nodes.iter().all(|n| n.alive));

        let paxos = s.paxos_state();
        assert_eq!(paxos.commit_index, None);
        assert!(paxos.log.is_empty());
        assert!(paxos.consistent);
    }

    #[test]
    fn snapshots_reflect_mutations() {
        let s = session();
        s.election_fast(None).unwrap();
        assert_eq!(s.ring_state().leader_id, Some(5));

        s.propose("SET x=1").unwrap();
        let paxos = s.paxos_state();
        assert_eq!(paxos.commit_index, Some(0));
        assert_eq!(paxos.log.get(&0).map(String::as_str), Some("SET x=1"));
        assert_eq!(paxos.acceptors[0].accepted.as_ref().unwrap().value, "SET x=1");
    }
}

// =============================================================================
// SECTION 2: ELECTION MODE TESTS
// =============================================================================

mod election_modes {
    use super::*;

    #[test]
    fn fast_election_returns_final_state_only() {
        let s = session();
        let view = s.election_fast(Some(2)).unwrap();
        assert_eq!(view.leader_id, Some(5));
        assert!(view.nodes.iter().filter(|n| n.alive).all(|n| n.elected == Some(5)));
    }

    #[test]
    fn traced_election_reports_leader_and_terminal_end() {
        let s = session();
        let trace = s.election_traced(Some(3)).unwrap();
        assert_eq!(trace.leader_id, Some(5));
        assert_eq!(*trace.steps.last().unwrap(), ElectionStep::End { leader: 5 });
    }

    #[test]
    fn traced_election_failure_reports_reason() {
        let s = session();
        for id in [1, 2, 3, 4] {
            s.crash(&FaultTarget::Node(id)).unwrap();
        }
        assert_eq!(
            s.election_traced(None),
            Err(SimError::InsufficientAliveNodes(1))
        );
    }

    #[test]
    fn streamed_steps_equal_traced_steps() {
        let a = session();
        let b = session();
        let traced = a.election_traced(Some(2)).unwrap();
        let streamed: Vec<_> = b.election_streamed(Some(2), Duration::ZERO).collect();
        assert_eq!(traced.steps, streamed);
    }

    #[test]
    fn streamed_election_commits_even_if_consumer_drops_early() {
        let s = session();
        let mut stream = s.election_streamed(None, Duration::ZERO);
        let first = stream.next();
        assert!(matches!(first, Some(ElectionStep::Start { .. })));
        drop(stream); // disconnect mid-run

        assert_eq!(s.ring_state().leader_id, Some(5));
    }

    #[test]
    fn streamed_failure_is_a_single_error_event() {
        let s = session();
        for id in [1, 2, 3, 4, 5] {
            s.crash(&FaultTarget::Node(id)).unwrap();
        }
        let steps: Vec<_> = s.election_streamed(None, Duration::ZERO).collect();
        assert_eq!(
            steps,
            vec![ElectionStep::Error {
                reason: "no alive nodes in the ring".into()
            }]
        );
    }

    #[test]
    fn reset_then_trace_is_deterministic() {
        let s = session();
        s.crash(&FaultTarget::Node(4)).unwrap();
        let first = s.election_traced(Some(1)).unwrap();
        s.reset_ring();
        let second = s.election_traced(Some(1)).unwrap();
        assert_eq!(first, second);
    }
}

// =============================================================================
// SECTION 3: FAULT ROUTING TESTS
// =============================================================================

mod fault_routing {
    use super::*;

    #[test]
    fn node_and_acceptor_targets_hit_different_halves() {
        let s = session();
        s.crash(&FaultTarget::Node(2)).unwrap();
        s.crash(&FaultTarget::Acceptor("US".into())).unwrap();

        let ring = s.ring_state();
        assert!(!ring.nodes.iter().find(|n| n.id == 2).unwrap().alive);
        let paxos = s.paxos_state();
        assert!(!paxos.acceptors.iter().find(|a| a.name == "US").unwrap().alive);
    }

    #[test]
    fn crash_and_recover_return_the_updated_half() {
        let s = session();

        match s.crash(&FaultTarget::Node(2)).unwrap() {
            FaultView::Ring(ring) => {
                assert!(!ring.nodes.iter().find(|n| n.id == 2).unwrap().alive)
            }
            other => panic!("expected ring view, got {other:?}"),
        }

        s.crash(&FaultTarget::Acceptor("US".into())).unwrap();
        match s.recover(&FaultTarget::Acceptor("US".into())).unwrap() {
            FaultView::Paxos(paxos) => {
                assert!(paxos.acceptors.iter().find(|a| a.name == "US").unwrap().alive)
            }
            other => panic!("expected paxos view, got {other:?}"),
        }
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let s = session();
        assert!(matches!(
            s.crash(&FaultTarget::Node(42)),
            Err(SimError::InvalidTarget(_))
        ));
        assert!(matches!(
            s.recover(&FaultTarget::Acceptor("MOON".into())),
            Err(SimError::InvalidTarget(_))
        ));
    }

    #[test]
    fn recovered_node_rejoins_the_next_election() {
        let s = session();
        s.crash(&FaultTarget::Node(5)).unwrap();
        s.election_fast(None).unwrap();
        assert_eq!(s.ring_state().leader_id, Some(4));

        s.recover(&FaultTarget::Node(5)).unwrap();
        s.election_fast(None).unwrap();
        assert_eq!(s.ring_state().leader_id, Some(5));
    }
}

// =============================================================================
// SECTION 4: PROPOSE POLICY TESTS
// =============================================================================

mod propose_policy {
    use super::*;

    #[test]
    fn propose_without_leader_elects_first() {
        let s = session();
        assert_eq!(s.ring_state().leader_id, None);
        let res = s.propose("SET x=1").unwrap();
        assert_eq!(res.proposer, 5);
        assert_eq!(res.slot, 0);
        assert_eq!(res.chosen, "SET x=1");
    }

    #[test]
    fn crashed_leader_is_replaced_on_next_propose() {
        let s = session();
        s.propose("SET x=1").unwrap();
        s.crash(&FaultTarget::Node(5)).unwrap();

        let res = s.propose("SET x=2").unwrap();

        assert_eq!(res.proposer, 4);
        assert_eq!(res.slot, 1);
        assert_eq!(s.ring_state().leader_id, Some(4));
    }

    #[test]
    fn minority_acceptor_crash_keeps_consensus_consistent() {
        let s = session();
        s.propose("SET x=1").unwrap();
        s.crash(&FaultTarget::Acceptor("EU".into())).unwrap();

        let res = s.propose("SET x=2").unwrap();

        assert_eq!(res.slot, 1);
        let paxos = s.paxos_state();
        assert_eq!(paxos.commit_index, Some(1));
        assert!(paxos.consistent);
    }

    #[test]
    fn majority_acceptor_crash_fails_and_changes_nothing() {
        let s = session();
        s.propose("SET x=1").unwrap();
        s.crash(&FaultTarget::Acceptor("EU".into())).unwrap();
        s.crash(&FaultTarget::Acceptor("US".into())).unwrap();

        let err = s.propose("SET x=2").unwrap_err();

        assert_eq!(
            err,
            SimError::NoQuorum {
                phase: PaxosPhase::Prepare,
                got: 1,
                need: 2,
            }
        );
        let paxos = s.paxos_state();
        assert_eq!(paxos.commit_index, Some(0));
        assert_eq!(paxos.log.len(), 1);
    }

    #[test]
    fn empty_command_is_rejected() {
        let s = session();
        assert_eq!(s.propose(""), Err(SimError::EmptyCommand));
    }

    #[test]
    fn propose_with_everything_dead_surfaces_the_election_error() {
        let s = session();
        for id in [1, 2, 3, 4, 5] {
            s.crash(&FaultTarget::Node(id)).unwrap();
        }
        assert_eq!(s.propose("SET x=1"), Err(SimError::NoAliveNodes));
    }

    #[test]
    fn reset_paxos_clears_log_but_not_acceptor_liveness() {
        let s = session();
        s.propose("SET x=1").unwrap();
        s.crash(&FaultTarget::Acceptor("EU".into())).unwrap();

        let view = s.reset_paxos();

        assert!(view.log.is_empty());
        assert_eq!(view.commit_index, None);
        assert!(!view.acceptors.iter().find(|a| a.name == "EU").unwrap().alive);
    }
}

// =============================================================================
// SECTION 5: CONCURRENT ACCESS TESTS
// =============================================================================

mod concurrency {
    use super::*;

    #[test]
    fn concurrent_proposals_serialize_into_distinct_slots() {
        let s = Arc::new(session());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || s.propose(&format!("SET k={i}")).unwrap().slot)
            })
            .collect();

        let mut slots: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        slots.sort_unstable();
        assert_eq!(slots, (0..8).collect::<Vec<u64>>());

        let paxos = s.paxos_state();
        assert_eq!(paxos.commit_index, Some(7));
        assert!(paxos.consistent);
    }

    #[test]
    fn crashes_and_snapshots_interleave_safely_with_elections() {
        let s = Arc::new(session());
        let elector = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    let _ = s.election_fast(None);
                }
            })
        };
        let chaos = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    s.crash(&FaultTarget::Node(5)).unwrap();
                    s.recover(&FaultTarget::Node(5)).unwrap();
                }
            })
        };
        for _ in 0..20 {
            // a snapshot taken under the read lock is internally consistent:
            // an elected node always names a node that exists in the view
            let ring = s.ring_state();
            for node in &ring.nodes {
                if let Some(elected) = node.elected {
                    assert!(ring.nodes.iter().any(|n| n.id == elected));
                }
            }
        }
        elector.join().unwrap();
        chaos.join().unwrap();
    }
}
