use std::fmt;

pub type SessionId = uuid::Uuid;

/// Starting price for every symbol in a new subscription.
///
/// The stream is a simulated random walk, not a view of ingested ticks, so
/// every session starts from the same point.
pub const INITIAL_PRICE: f64 = 100.0;

/// Lifecycle of a streaming session: `Active` until the dispatch loop
/// ends, then `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Active => "Active",
            SessionState::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}
