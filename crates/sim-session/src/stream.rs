//! # stream
//!
//! why: redeliver a committed election trace step by step for animation
//! relations: produced by session.rs from sim-core traces
//! what: StepStream iterator with a caller-configured inter-step delay

use std::time::Duration;

use sim_core::ElectionStep;

/// An ordered step sequence delivered incrementally
///
/// The election has already run to completion when a StepStream is handed
/// out, so dropping it mid-iteration (a consumer disconnect) stops delivery
/// and nothing else. The delay paces `hop` and `coord` steps only, matching
/// how the client animates; it is presentation, not protocol.
pub struct StepStream {
    steps: std::vec::IntoIter<ElectionStep>,
    delay: Duration,
}

impl StepStream {
    pub fn new(steps: Vec<ElectionStep>, delay: Duration) -> Self {
        Self {
            steps: steps.into_iter(),
            delay,
        }
    }

    /// A stream that delivers a single terminal error event
    pub fn error(reason: String) -> Self {
        Self::new(vec![ElectionStep::Error { reason }], Duration::ZERO)
    }
}

impl Iterator for StepStream {
    type Item = ElectionStep;

    fn next(&mut self) -> Option<ElectionStep> {
        let step = self.steps.next()?;
        if !self.delay.is_zero()
            && matches!(step, ElectionStep::Hop { .. } | ElectionStep::Coord { .. })
        {
            std::thread::sleep(self.delay);
        }
        Some(step)
    }
}
