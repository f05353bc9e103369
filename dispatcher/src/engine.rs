//! The streaming dispatch loop.
//!
//! For each streaming call it:
//!   1. Stops if the call's token is cancelled (`Active` → `Cancelled`).
//!   2. Waits for the next cadence tick (or yields when unthrottled).
//!   3. Advances the session one round and writes each update in order.

use rand::Rng;
use session::{SessionState, SubscriptionSession};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sink::UpdateSink;
use crate::time::now_ms;
use crate::types::{CancelReason, DispatchReport, DispatcherConfig};

#[derive(Debug, Clone, Default)]
pub struct StreamingDispatcher {
    cfg: DispatcherConfig,
}

impl StreamingDispatcher {
    pub fn new(cfg: DispatcherConfig) -> Self {
        Self { cfg }
    }

    fn ticker(&self) -> Option<Interval> {
        if self.cfg.interval.is_zero() {
            return None;
        }
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }

    /// Run `session` until `cancel` fires or the sink rejects a write.
    ///
    /// The session and generator are consumed: they are released when the
    /// call ends. No update is written once cancellation has been observed.
    pub async fn run<K, R>(
        &self,
        mut session: SubscriptionSession,
        mut rng: R,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> DispatchReport
    where
        K: UpdateSink + ?Sized,
        R: Rng + Send,
    {
        let session_id = session.id();
        let mut ticker = self.ticker();
        let mut iterations = 0u64;
        let mut updates_sent = 0u64;

        info!(
            %session_id,
            state = %SessionState::Active,
            symbols = session.len(),
            interval_ms = self.cfg.interval.as_millis() as u64,
            "stream session active"
        );

        let reason = 'dispatch: loop {
            if cancel.is_cancelled() {
                break CancelReason::Cancelled;
            }

            // nothing will ever be emitted: park until the call ends
            if session.is_empty() {
                cancel.cancelled().await;
                break CancelReason::Cancelled;
            }

            match ticker.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break CancelReason::Cancelled,
                        _ = ticker.tick() => {}
                    }
                }
                None => tokio::task::yield_now().await,
            }

            for update in session.next_tick(&mut rng, now_ms()) {
                if cancel.is_cancelled() {
                    break 'dispatch CancelReason::Cancelled;
                }

                let written = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'dispatch CancelReason::Cancelled,
                    res = sink.send(update) => res,
                };

                if let Err(e) = written {
                    debug!(%session_id, error = %e, "stream write failed, treating as disconnect");
                    break 'dispatch CancelReason::SinkClosed;
                }
                updates_sent += 1;
            }

            iterations += 1;
        };

        let state = SessionState::Cancelled;
        info!(
            %session_id,
            %state,
            ?reason,
            iterations,
            updates_sent,
            "stream session ended"
        );

        DispatchReport {
            session_id,
            state,
            reason,
            iterations,
            updates_sent,
        }
    }
}
