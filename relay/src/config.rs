use std::str::FromStr;
use std::time::Duration;

use dispatcher::DispatcherConfig;
use market::{DEFAULT_HISTORY_CAPACITY, DEFAULT_WINDOW_CAPACITY, StoreConfig};
use session::INITIAL_PRICE;

use crate::error::ConfigError;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:50051";
pub const DEFAULT_STREAM_INTERVAL_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    /// host:port the WebSocket listener binds to. Plaintext.
    pub listen_addr: String,

    // =========================
    // Ingestion
    // =========================
    /// Number of most recent prices in each symbol's moving average.
    pub window_capacity: usize,

    /// Raw ticks retained per symbol before the oldest are dropped.
    ///
    /// Must be at least `window_capacity`.
    pub history_capacity: usize,

    // =========================
    // Streaming
    // =========================
    /// Delay between emission rounds of every price stream, in ms.
    ///
    /// 0 streams as fast as each client reads.
    pub stream_interval_ms: u64,

    /// Price every streamed symbol starts from.
    pub initial_price: f64,

    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            stream_interval_ms: DEFAULT_STREAM_INTERVAL_MS,
            initial_price: INITIAL_PRICE,
            log_json: false,
        }
    }
}

/// `host:port` with a non-empty host and a numeric port. The host is
/// resolved at bind time, so names like `localhost` are accepted.
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();

        Ok(Self {
            listen_addr: lookup("RELAY_LISTEN_ADDR").unwrap_or(d.listen_addr),
            window_capacity: parse_var(&lookup, "RELAY_WINDOW_CAPACITY", d.window_capacity)?,
            history_capacity: parse_var(&lookup, "RELAY_HISTORY_CAPACITY", d.history_capacity)?,
            stream_interval_ms: parse_var(
                &lookup,
                "RELAY_STREAM_INTERVAL_MS",
                d.stream_interval_ms,
            )?,
            initial_price: parse_var(&lookup, "RELAY_INITIAL_PRICE", d.initial_price)?,
            log_json: lookup("APP_ENV").is_some_and(|v| v == "production"),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_host_port(&self.listen_addr) {
            return Err(ConfigError::Invalid {
                key: "RELAY_LISTEN_ADDR",
                value: self.listen_addr.clone(),
            });
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.history_capacity < self.window_capacity {
            return Err(ConfigError::HistoryBelowWindow {
                history: self.history_capacity,
                window: self.window_capacity,
            });
        }
        if !self.initial_price.is_finite() {
            return Err(ConfigError::NonFinitePrice(self.initial_price));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            window_capacity: self.window_capacity,
            history_capacity: self.history_capacity,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            interval: Duration::from_millis(self.stream_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_the_reference_server() {
        let cfg = RelayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, RelayConfig::default());
        assert_eq!(cfg.listen_addr, "0.0.0.0:50051");
        assert_eq!(cfg.window_capacity, 20);
        assert_eq!(cfg.initial_price, 100.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = RelayConfig::from_lookup(lookup(&[
            ("RELAY_LISTEN_ADDR", "127.0.0.1:6000"),
            ("RELAY_WINDOW_CAPACITY", " 50 "),
            ("RELAY_STREAM_INTERVAL_MS", "0"),
            ("APP_ENV", "production"),
        ]))
        .unwrap();

        assert_eq!(cfg.listen_addr, "127.0.0.1:6000");
        assert_eq!(cfg.window_capacity, 50);
        assert_eq!(cfg.stream_interval_ms, 0);
        assert!(cfg.log_json);
        assert!(cfg.dispatcher_config().interval.is_zero());
    }

    #[test]
    fn unparsable_value_names_the_key() {
        let err = RelayConfig::from_lookup(lookup(&[("RELAY_WINDOW_CAPACITY", "twenty")]))
            .unwrap_err();
        assert!(err.to_string().contains("RELAY_WINDOW_CAPACITY"));
    }

    #[test]
    fn validation_rejects_inconsistent_capacities() {
        let cfg = RelayConfig {
            window_capacity: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroWindow)));

        let cfg = RelayConfig {
            window_capacity: 30,
            history_capacity: 10,
            ..RelayConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::HistoryBelowWindow { .. })
        ));

        let cfg = RelayConfig {
            initial_price: f64::NAN,
            ..RelayConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NonFinitePrice(_))));

        for bad in ["nowhere", ":50051", "localhost:", "localhost:port", "host:70000"] {
            let cfg = RelayConfig {
                listen_addr: bad.into(),
                ..RelayConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Invalid { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn listen_addr_accepts_hostnames_and_ip_literals() {
        for good in ["localhost:50051", "relay.internal:8080", "0.0.0.0:50051", "[::1]:50051"] {
            let cfg = RelayConfig {
                listen_addr: good.into(),
                ..RelayConfig::default()
            };
            assert!(cfg.validate().is_ok(), "{good} should be accepted");
        }
    }
}
