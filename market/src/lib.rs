//! Tick ingestion and per-symbol moving averages.
//!
//! [`TickStore`] is the only state shared between connections: every
//! `SendPrice` call lands here, and the post-update [`WindowStats`] flow back
//! out for the observability record.

pub mod rolling_window;
pub mod store;
pub mod types;

pub use rolling_window::{DEFAULT_WINDOW_CAPACITY, RollingWindow};
pub use store::{DEFAULT_HISTORY_CAPACITY, StoreConfig, TickStore};
pub use types::{Tick, WindowStats};
