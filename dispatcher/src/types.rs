//! Shared types used by the dispatcher.

use std::time::Duration;

use session::{SessionId, SessionState};

pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration knobs for the dispatch loop.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Minimum delay between two emission rounds of a session.
    ///
    /// `Duration::ZERO` emits as fast as the sink accepts writes, yielding to
    /// the runtime between rounds.
    pub interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_STREAM_INTERVAL,
        }
    }
}

/// Why a dispatch loop left the `Active` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The call's cancellation token fired (client went away or server shutdown).
    Cancelled,
    /// A write to the sink failed; treated as a client disconnect.
    SinkClosed,
}

/// Outcome of one streaming call. Always a normal completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub session_id: SessionId,
    pub state: SessionState,
    pub reason: CancelReason,
    /// Completed emission rounds.
    pub iterations: u64,
    /// Updates accepted by the sink.
    pub updates_sent: u64,
}
