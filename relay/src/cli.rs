use clap::{Args, Parser, Subcommand};
use relay::RelayConfig;

#[derive(Debug, Parser)]
#[clap(name = "tickrelay", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the relay server
    Serve(ServeArgs),
    /// Bridge an exchange trade stream into a running relay
    Feed(FeedArgs),
    /// Print a price stream from a running relay
    Watch(WatchArgs),
}

/// Overrides applied on top of the environment configuration.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (host:port)
    #[clap(long)]
    pub listen: Option<String>,

    /// Moving-average window size
    #[clap(long)]
    pub window: Option<usize>,

    /// Raw ticks retained per symbol
    #[clap(long)]
    pub history: Option<usize>,

    /// Delay between stream rounds in ms (0 = unthrottled)
    #[clap(long)]
    pub interval_ms: Option<u64>,

    /// Emit JSON log lines
    #[clap(long)]
    pub json_logs: bool,
}

#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Exchange symbol, e.g. btcusdt
    #[clap(long, default_value = "btcusdt")]
    pub symbol: String,

    /// Relay to forward trades to
    #[clap(long, default_value = "ws://127.0.0.1:50051")]
    pub relay: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Symbols to stream
    #[clap(default_values_t = [String::from("BTCUSDT"), String::from("ETHUSDT")])]
    pub symbols: Vec<String>,

    #[clap(long, default_value = "ws://127.0.0.1:50051")]
    pub relay: String,
}

impl ServeArgs {
    pub(crate) fn apply(&self, mut cfg: RelayConfig) -> RelayConfig {
        if let Some(listen) = &self.listen {
            cfg.listen_addr = listen.clone();
        }
        if let Some(window) = self.window {
            cfg.window_capacity = window;
        }
        if let Some(history) = self.history {
            cfg.history_capacity = history;
        }
        if let Some(interval) = self.interval_ms {
            cfg.stream_interval_ms = interval;
        }
        cfg.log_json |= self.json_logs;
        cfg
    }
}
