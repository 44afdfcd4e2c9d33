//! # sim-session
//!
//! why: expose one serialized simulation session to a polling/streaming
//! visualization client
//! relations: drives sim-core engines; views are the client wire contract
//! what: SimSession coordinator, snapshot view types, step streamer

pub mod api;
pub mod session;
pub mod stream;

pub use api::{
    AcceptedView, AcceptorView, FaultView, NodeView, PaxosStateView, ProposeView, RingStateView,
    TraceView,
};
pub use session::SimSession;
pub use stream::StepStream;
