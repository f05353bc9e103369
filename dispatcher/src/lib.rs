//! Streaming dispatcher.
//!
//! Drives one [`session::SubscriptionSession`] per streaming call:
//!   1. Checks the call's cancellation token.
//!   2. Waits for the next cadence tick.
//!   3. Advances the session and writes every update to the sink.
//!
//! A failed write is a client disconnect, not an error: the loop stops and
//! the call completes normally.

pub mod engine;
pub mod sink;
pub mod time;
pub mod types;

pub use engine::StreamingDispatcher;
pub use sink::{SinkError, UpdateSink};
pub use types::{CancelReason, DispatchReport, DispatcherConfig};
