//! Upstream feed bridge.
//!
//! Subscribes to an exchange trade stream and forwards every trade price to
//! the relay as a `SendPrice` call. Both connections are re-established
//! after a fixed delay when either side drops.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RelayClient;
use crate::error::FeedError;
use crate::wire::PriceUpdate;

pub const BINANCE_US_WS: &str = "wss://stream.binance.us:9443/ws";
pub const PING_INTERVAL: Duration = Duration::from_secs(10);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Full trade stream URL, e.g. `wss://stream.binance.us:9443/ws/btcusdt@trade`.
    pub exchange_url: String,
    /// Symbol reported to the relay for every trade.
    pub symbol: String,
    pub relay_url: String,
    pub ping_interval: Duration,
    pub reconnect_delay: Duration,
}

impl FeedConfig {
    /// Binance.US trade stream for `symbol`, forwarded to `relay_url`.
    pub fn binance(symbol: &str, relay_url: impl Into<String>) -> Self {
        let symbol = symbol.to_uppercase();
        Self {
            exchange_url: format!("{BINANCE_US_WS}/{}@trade", symbol.to_lowercase()),
            symbol,
            relay_url: relay_url.into(),
            ping_interval: PING_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// The subset of a Binance `trade` event the bridge uses.
#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "p")]
    price: Option<String>,
}

/// Turn one exchange frame into a relay update.
///
/// Frames without a price (subscription acks, other event types) yield
/// `Ok(None)`. The timestamp is the local receive time.
pub fn parse_trade(
    raw: &str,
    symbol: &str,
    received_ms: i64,
) -> Result<Option<PriceUpdate>, FeedError> {
    let event: TradeEvent = serde_json::from_str(raw)?;

    let Some(price_str) = event.price else {
        return Ok(None);
    };

    let price: f64 = price_str
        .parse()
        .map_err(|_| FeedError::InvalidPrice(price_str.clone()))?;

    Ok(Some(PriceUpdate {
        symbol: symbol.to_string(),
        price,
        timestamp: received_ms,
    }))
}

/// Run the bridge until `shutdown` fires.
pub async fn run_feed(cfg: FeedConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    loop {
        if let Err(e) = bridge_once(&cfg, &shutdown).await {
            warn!(error = %e, "feed bridge disconnected");
        }

        if shutdown.is_cancelled() {
            info!("feed bridge stopped");
            return Ok(());
        }

        info!(delay_ms = cfg.reconnect_delay.as_millis() as u64, "reconnecting feed bridge");
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = tokio::time::sleep(cfg.reconnect_delay) => {}
        }
    }
}

async fn bridge_once(cfg: &FeedConfig, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let mut relay = RelayClient::connect(&cfg.relay_url).await?;

    let (ws, _) = connect_async(cfg.exchange_url.as_str()).await?;
    info!(url = %cfg.exchange_url, symbol = %cfg.symbol, "connected to exchange trade stream");
    let (mut write, mut read) = ws.split();

    let mut ping = tokio::time::interval(cfg.ping_interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }

            _ = ping.tick() => {
                write.send(Message::Ping(Vec::new().into())).await?;
            }

            msg = read.next() => {
                let Some(msg) = msg else {
                    anyhow::bail!("exchange closed the stream");
                };

                let text = match msg? {
                    Message::Text(text) => text,
                    Message::Close(frame) => anyhow::bail!("exchange sent close: {frame:?}"),
                    _ => continue,
                };

                match parse_trade(text.as_str(), &cfg.symbol, chrono::Utc::now().timestamp_millis()) {
                    Ok(Some(update)) => {
                        debug!(symbol = %update.symbol, price = update.price, "forwarding trade");
                        relay.send_price(&update).await?;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "skipping exchange frame"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binance_config_builds_lowercase_stream_url() {
        let cfg = FeedConfig::binance("btcusdt", "ws://127.0.0.1:50051");
        assert_eq!(cfg.exchange_url, "wss://stream.binance.us:9443/ws/btcusdt@trade");
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.ping_interval, Duration::from_secs(10));
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(3));
    }

    #[test]
    fn trade_frame_becomes_update() {
        let raw = r#"{"e":"trade","E":1744135122051,"s":"BTCUSDT","t":1,"p":"77712.62000000","q":"0.001","T":1744135122050,"m":true,"M":true}"#;

        let update = parse_trade(raw, "BTCUSDT", 1744135122099).unwrap().unwrap();
        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.price, 77712.62);
        assert_eq!(update.timestamp, 1744135122099);
    }

    #[test]
    fn frames_without_price_are_skipped() {
        assert_eq!(parse_trade(r#"{"result":null,"id":1}"#, "BTCUSDT", 0).unwrap(), None);
    }

    #[test]
    fn bad_price_and_bad_json_are_errors() {
        assert!(matches!(
            parse_trade(r#"{"p":"abc"}"#, "BTCUSDT", 0),
            Err(FeedError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_trade("nope", "BTCUSDT", 0),
            Err(FeedError::Parse(_))
        ));
    }
}
