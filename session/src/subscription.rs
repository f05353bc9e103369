//! Per-client price stream state.
//!
//! A `SubscriptionSession` is owned by exactly one dispatcher loop and is
//! never shared. It tracks the last emitted price per symbol and advances
//! each one by a random step on every call to [`SubscriptionSession::next_tick`].

use std::collections::BTreeMap;

use market::Tick;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::model::{INITIAL_PRICE, SessionId};
use crate::step::price_step;

#[derive(Debug, Clone)]
pub struct SubscriptionSession {
    id: SessionId,

    /// symbol → last emitted price. BTreeMap gives the stable lexicographic
    /// emission order.
    prices: BTreeMap<String, f64>,

    /// Number of completed `next_tick` rounds.
    rounds: u64,
}

impl SubscriptionSession {
    /// Build a session starting every symbol at [`INITIAL_PRICE`].
    /// Duplicates collapse to one entry; an empty request is legal.
    pub fn create<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_initial_price(symbols, INITIAL_PRICE)
    }

    pub fn with_initial_price<I, S>(symbols: I, initial_price: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prices: BTreeMap<String, f64> = symbols
            .into_iter()
            .map(|s| (s.into(), initial_price))
            .collect();

        let session = Self {
            id: Uuid::new_v4(),
            prices,
            rounds: 0,
        };

        debug!(session_id = %session.id, symbols = session.prices.len(), "session created");
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Advance every tracked symbol by one random step.
    ///
    /// Returns one tick per symbol, in lexicographic symbol order, each
    /// stamped with `timestamp_ms`.
    pub fn next_tick<R: Rng + ?Sized>(&mut self, rng: &mut R, timestamp_ms: i64) -> Vec<Tick> {
        let mut out = Vec::with_capacity(self.prices.len());

        for (symbol, price) in self.prices.iter_mut() {
            *price += price_step(rng);
            out.push(Tick::new(symbol.clone(), *price, timestamp_ms));
        }

        self.rounds += 1;
        out
    }

    /// Last emitted (or initial) price for `symbol`.
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Tracked symbols in emission order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}
