//! TickStore
//!
//! Registry of per-symbol market state fed by the ingestion path.
//! Responsibilities:
//!   • Lazily create a rolling window the first time a symbol is seen
//!   • Retain a bounded history of raw ticks per symbol
//!   • Return post-update window stats to the caller
//!
//! A single lock guards the whole registry. It is only ever held for
//! O(window) work and never across an await point, so ingestion cannot
//! stall the streaming side.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::debug;

use crate::rolling_window::{DEFAULT_WINDOW_CAPACITY, RollingWindow};
use crate::types::{Tick, WindowStats};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Capacity of every per-symbol rolling window.
    pub window_capacity: usize,

    /// Number of raw ticks retained per symbol.
    ///
    /// Always at least `window_capacity`; older ticks are dropped first.
    /// `SymbolState::ingested` keeps counting past this bound.
    pub history_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Apply the structural bounds: window ≥ 1, history ≥ window.
    pub fn normalized(self) -> Self {
        let window_capacity = self.window_capacity.max(1);
        Self {
            window_capacity,
            history_capacity: self.history_capacity.max(window_capacity),
        }
    }
}

#[derive(Debug)]
struct SymbolState {
    window: RollingWindow,
    history: VecDeque<Tick>,
    ingested: u64,
}

impl SymbolState {
    fn new(cfg: &StoreConfig) -> Self {
        Self {
            window: RollingWindow::new(cfg.window_capacity),
            history: VecDeque::new(),
            ingested: 0,
        }
    }

    fn stats(&self) -> WindowStats {
        WindowStats {
            window_size: self.window.size(),
            moving_average: self.window.average(),
        }
    }
}

/// Thread-safe symbol → (window, history) registry.
///
/// Constructed once at startup and shared by handle (`Arc<TickStore>`).
pub struct TickStore {
    cfg: StoreConfig,
    symbols: Mutex<HashMap<String, SymbolState>>,
}

impl Default for TickStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl TickStore {
    pub fn new(cfg: StoreConfig) -> Self {
        Self {
            cfg: cfg.normalized(),
            symbols: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.cfg
    }

    /// Record a tick and return the symbol's window stats after the update.
    ///
    /// History append and window push happen under the same lock, so a
    /// concurrent reader never sees one without the other.
    pub fn ingest(&self, tick: Tick) -> WindowStats {
        let mut guard = self.symbols.lock();

        let state = guard.entry(tick.symbol.clone()).or_insert_with(|| {
            debug!(
                symbol = %tick.symbol,
                window_capacity = self.cfg.window_capacity,
                "tracking new symbol"
            );
            SymbolState::new(&self.cfg)
        });

        state.window.push(tick.price);
        state.ingested += 1;

        if state.history.len() == self.cfg.history_capacity {
            state.history.pop_front();
        }
        state.history.push_back(tick);

        state.stats()
    }

    /// Current window stats for `symbol`, or `None` if it was never ingested.
    pub fn snapshot(&self, symbol: &str) -> Option<WindowStats> {
        self.symbols.lock().get(symbol).map(SymbolState::stats)
    }

    /// Retained ticks for `symbol`, oldest first.
    pub fn history(&self, symbol: &str) -> Vec<Tick> {
        self.symbols
            .lock()
            .get(symbol)
            .map(|s| s.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn history_len(&self, symbol: &str) -> usize {
        self.symbols
            .lock()
            .get(symbol)
            .map_or(0, |s| s.history.len())
    }

    /// Total ticks ever ingested for `symbol`, including ones aged out of history.
    pub fn ingested_count(&self, symbol: &str) -> u64 {
        self.symbols.lock().get(symbol).map_or(0, |s| s.ingested)
    }

    /// Known symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self.symbols.lock().keys().cloned().collect();
        out.sort();
        out
    }
}
