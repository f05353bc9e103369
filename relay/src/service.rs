//! MarketDataService
//!
//! Transport-independent implementation of the two RPCs:
//!   • `SendPrice`    → ingest into the shared [`TickStore`], log the record
//!   • `StreamPrices` → build a session and hand it to the dispatcher
//!
//! The server module owns framing and sockets; this module never sees them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dispatcher::{DispatchReport, StreamingDispatcher, UpdateSink};
use market::{Tick, TickStore, WindowStats};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use session::SubscriptionSession;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::RelayConfig;
use crate::wire::{PriceRequest, PriceUpdate};

/// Human-readable observability line for one ingested tick.
pub fn tick_record(tick: &Tick, stats: &WindowStats) -> String {
    format!(
        "Symbol: {} | Price: ${} | MA({}): ${} | Timestamp: {}",
        tick.symbol, tick.price, stats.window_size, stats.moving_average, tick.timestamp_ms
    )
}

pub struct MarketDataService {
    store: Arc<TickStore>,
    dispatcher: StreamingDispatcher,
    initial_price: f64,
    active_streams: AtomicUsize,
}

/// Decrements the active stream gauge however the stream ends.
struct StreamGuard<'a>(&'a AtomicUsize);

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl MarketDataService {
    pub fn new(store: Arc<TickStore>, dispatcher: StreamingDispatcher, initial_price: f64) -> Self {
        Self {
            store,
            dispatcher,
            initial_price,
            active_streams: AtomicUsize::new(0),
        }
    }

    pub fn from_config(cfg: &RelayConfig) -> Self {
        Self::new(
            Arc::new(TickStore::new(cfg.store_config())),
            StreamingDispatcher::new(cfg.dispatcher_config()),
            cfg.initial_price,
        )
    }

    pub fn store(&self) -> &Arc<TickStore> {
        &self.store
    }

    /// Streams currently being dispatched.
    pub fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::Acquire)
    }

    /// Ingest one tick. Never fails for a decoded update.
    pub fn send_price(&self, update: PriceUpdate) -> WindowStats {
        let tick = Tick::from(update);
        let stats = self.store.ingest(tick.clone());

        info!(
            symbol = %tick.symbol,
            price = tick.price,
            window_size = stats.window_size,
            moving_average = stats.moving_average,
            timestamp = tick.timestamp_ms,
            "{}",
            tick_record(&tick, &stats)
        );

        stats
    }

    /// Stream simulated prices for the requested symbols until `cancel`
    /// fires or the sink rejects a write. Each call gets its own generator.
    pub async fn stream_prices<K>(
        &self,
        request: PriceRequest,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> DispatchReport
    where
        K: UpdateSink + ?Sized,
    {
        self.stream_prices_with_rng(request, StdRng::from_entropy(), sink, cancel)
            .await
    }

    pub async fn stream_prices_with_rng<K, R>(
        &self,
        request: PriceRequest,
        rng: R,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> DispatchReport
    where
        K: UpdateSink + ?Sized,
        R: Rng + Send,
    {
        let session = SubscriptionSession::with_initial_price(request.symbols, self.initial_price);

        self.active_streams.fetch_add(1, Ordering::AcqRel);
        let _guard = StreamGuard(&self.active_streams);

        self.dispatcher.run(session, rng, sink, cancel).await
    }
}
