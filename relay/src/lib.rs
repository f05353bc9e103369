//! Market-data relay: ingests price ticks over `SendPrice` and serves
//! simulated price streams over `StreamPrices`.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod server;
pub mod service;
pub mod wire;

pub use client::{PriceStream, RelayClient};
pub use config::RelayConfig;
pub use error::{ClientError, ConfigError, FeedError, WireError};
pub use server::RelayServer;
pub use service::MarketDataService;
pub use wire::{PriceRequest, PriceUpdate};
