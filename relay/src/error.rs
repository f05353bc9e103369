use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error codes used on the wire.
pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("unsupported frame type: {0}")]
    UnsupportedFrame(&'static str),

    #[error("unknown method: {method}")]
    UnknownMethod { id: Option<Value>, method: String },

    #[error("invalid params for {method}: {source}")]
    InvalidParams {
        id: Option<Value>,
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl WireError {
    pub fn code(&self) -> i64 {
        match self {
            WireError::Parse(_) | WireError::UnsupportedFrame(_) => PARSE_ERROR,
            WireError::UnknownMethod { .. } => METHOD_NOT_FOUND,
            WireError::InvalidParams { .. } => INVALID_PARAMS,
        }
    }

    /// Request id to echo back, when the frame got far enough to carry one.
    pub fn request_id(&self) -> Option<&Value> {
        match self {
            WireError::UnknownMethod { id, .. } | WireError::InvalidParams { id, .. } => id.as_ref(),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("window capacity must be positive")]
    ZeroWindow,

    #[error("history capacity {history} is below window capacity {window}")]
    HistoryBelowWindow { history: usize, window: usize },

    #[error("initial price must be finite, got {0}")]
    NonFinitePrice(f64),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("connection closed by server")]
    Closed,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("malformed trade frame: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid trade price {0:?}")]
    InvalidPrice(String),
}
