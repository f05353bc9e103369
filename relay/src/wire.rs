//! JSON-RPC 2.0 framing for the relay's WebSocket transport.
//!
//! Every WebSocket text frame carries exactly one message:
//!
//! ```text
//! client → server   {"jsonrpc":"2.0","id":1,"method":"SendPrice","params":{"symbol":..,"price":..,"timestamp":..}}
//! server → client   {"jsonrpc":"2.0","id":1,"result":{}}
//!
//! client → server   {"jsonrpc":"2.0","id":2,"method":"StreamPrices","params":{"symbols":[..]}}
//! server → client   {"jsonrpc":"2.0","method":"PriceUpdate","params":{..}}   (repeated)
//! server → client   {"jsonrpc":"2.0","id":2,"result":{}}                  (only when the server ends the stream)
//! ```

use market::Tick;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WireError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const SEND_PRICE: &str = "SendPrice";
pub const STREAM_PRICES: &str = "StreamPrices";
pub const PRICE_UPDATE: &str = "PriceUpdate";

/// One price observation as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl From<Tick> for PriceUpdate {
    fn from(t: Tick) -> Self {
        Self {
            symbol: t.symbol,
            price: t.price,
            timestamp: t.timestamp_ms,
        }
    }
}

impl From<PriceUpdate> for Tick {
    fn from(u: PriceUpdate) -> Self {
        Tick::new(u.symbol, u.price, u.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// A decoded client call.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SendPrice { id: Option<Value>, update: PriceUpdate },
    StreamPrices { id: Option<Value>, request: PriceRequest },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::SendPrice { .. } => SEND_PRICE,
            Request::StreamPrices { .. } => STREAM_PRICES,
        }
    }

    /// Request id as sent by the client: any JSON number or string.
    pub fn id(&self) -> Option<&Value> {
        match self {
            Request::SendPrice { id, .. } | Request::StreamPrices { id, .. } => id.as_ref(),
        }
    }
}

/// A decoded server frame, as seen by clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ack { id: Option<Value> },
    Update(PriceUpdate),
    Error { id: Option<Value>, code: i64, message: String },
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct RawServerMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Deserialize)]
struct RawError {
    code: i64,
    message: String,
}

fn params<T: for<'de> Deserialize<'de>>(
    id: Option<Value>,
    method: &'static str,
    params: Value,
) -> Result<T, WireError> {
    serde_json::from_value(params).map_err(|source| WireError::InvalidParams { id, method, source })
}

pub fn decode_request(text: &str) -> Result<Request, WireError> {
    let raw: RawRequest = serde_json::from_str(text).map_err(WireError::Parse)?;
    let id = raw.id;

    match raw.method.as_str() {
        SEND_PRICE => {
            let update = params(id.clone(), SEND_PRICE, raw.params)?;
            Ok(Request::SendPrice { id, update })
        }
        STREAM_PRICES => {
            // a bare call with no params subscribes to nothing
            let p = if raw.params.is_null() {
                PriceRequest::default()
            } else {
                params(id.clone(), STREAM_PRICES, raw.params)?
            };
            Ok(Request::StreamPrices { id, request: p })
        }
        _ => Err(WireError::UnknownMethod {
            id,
            method: raw.method,
        }),
    }
}

pub fn encode_send_price(id: u64, update: &PriceUpdate) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": SEND_PRICE,
        "params": update,
    })
    .to_string()
}

pub fn encode_stream_prices(id: u64, request: &PriceRequest) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": STREAM_PRICES,
        "params": request,
    })
    .to_string()
}

pub fn encode_ack(id: Option<&Value>) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": {},
    })
    .to_string()
}

pub fn encode_update(update: &PriceUpdate) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": PRICE_UPDATE,
        "params": update,
    })
    .to_string()
}

pub fn encode_error(err: &WireError) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": err.request_id(),
        "error": {
            "code": err.code(),
            "message": err.to_string(),
        },
    })
    .to_string()
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, WireError> {
    let raw: RawServerMessage = serde_json::from_str(text).map_err(WireError::Parse)?;

    if let Some(err) = raw.error {
        return Ok(ServerMessage::Error {
            id: raw.id,
            code: err.code,
            message: err.message,
        });
    }

    match raw.method.as_deref() {
        Some(PRICE_UPDATE) => {
            let update = params(raw.id, PRICE_UPDATE, raw.params.unwrap_or(Value::Null))?;
            Ok(ServerMessage::Update(update))
        }
        Some(other) => Err(WireError::UnknownMethod {
            id: raw.id,
            method: other.to_string(),
        }),
        None => Ok(ServerMessage::Ack { id: raw.id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR};
    use serde_json::json;

    #[test]
    fn decodes_send_price() {
        let raw = r#"{"jsonrpc":"2.0","id":7,"method":"SendPrice","params":{"symbol":"BTCUSDT","price":77712.62,"timestamp":1744135122050}}"#;

        let req = decode_request(raw).unwrap();
        assert_eq!(
            req,
            Request::SendPrice {
                id: Some(json!(7)),
                update: PriceUpdate {
                    symbol: "BTCUSDT".into(),
                    price: 77712.62,
                    timestamp: 1744135122050,
                },
            }
        );
        assert_eq!(req.method(), SEND_PRICE);
    }

    #[test]
    fn stream_request_keeps_requested_order_and_duplicates() {
        let raw = r#"{"id":1,"method":"StreamPrices","params":{"symbols":["ETHUSDT","BTCUSDT","ETHUSDT"]}}"#;

        let Request::StreamPrices { id, request } = decode_request(raw).unwrap() else {
            panic!("expected StreamPrices");
        };
        assert_eq!(id, Some(json!(1)));
        assert_eq!(request.symbols, vec!["ETHUSDT", "BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn stream_request_without_params_is_empty() {
        let req = decode_request(r#"{"id":3,"method":"StreamPrices"}"#).unwrap();
        assert_eq!(
            req,
            Request::StreamPrices {
                id: Some(json!(3)),
                request: PriceRequest::default(),
            }
        );
    }

    #[test]
    fn string_ids_are_accepted_and_echoed() {
        let raw = r#"{"jsonrpc":"2.0","id":"abc","method":"SendPrice","params":{"symbol":"BTCUSDT","price":1.5,"timestamp":1}}"#;

        let req = decode_request(raw).unwrap();
        assert_eq!(req.id(), Some(&json!("abc")));

        let ack: Value = serde_json::from_str(&encode_ack(req.id())).unwrap();
        assert_eq!(ack["id"], "abc");

        let err = decode_request(r#"{"id":"q-1","method":"Nope"}"#).unwrap_err();
        assert_eq!(err.request_id(), Some(&json!("q-1")));
    }

    #[test]
    fn null_id_is_treated_as_absent() {
        let req = decode_request(r#"{"id":null,"method":"StreamPrices"}"#).unwrap();
        assert_eq!(req.id(), None);
    }

    #[test]
    fn garbage_is_a_parse_error_without_id() {
        let err = decode_request("not json").unwrap_err();
        assert_eq!(err.code(), PARSE_ERROR);
        assert_eq!(err.request_id(), None);

        let frame: Value = serde_json::from_str(&encode_error(&err)).unwrap();
        assert!(frame["id"].is_null());
        assert_eq!(frame["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn unknown_method_echoes_id() {
        let err = decode_request(r#"{"id":9,"method":"Nope"}"#).unwrap_err();
        assert_eq!(err.code(), METHOD_NOT_FOUND);
        assert_eq!(err.request_id(), Some(&json!(9)));
    }

    #[test]
    fn missing_price_is_invalid_params() {
        let err =
            decode_request(r#"{"id":4,"method":"SendPrice","params":{"symbol":"X"}}"#).unwrap_err();
        assert_eq!(err.code(), INVALID_PARAMS);
        assert_eq!(err.request_id(), Some(&json!(4)));
    }

    #[test]
    fn server_frames_decode_back() {
        let update = PriceUpdate {
            symbol: "ETHUSDT".into(),
            price: 99.5,
            timestamp: 1,
        };

        assert_eq!(
            decode_server_message(&encode_update(&update)).unwrap(),
            ServerMessage::Update(update)
        );
        assert_eq!(
            decode_server_message(&encode_ack(Some(&json!(5)))).unwrap(),
            ServerMessage::Ack { id: Some(json!(5)) }
        );

        let err = decode_request("{").unwrap_err();
        let ServerMessage::Error { id, code, .. } =
            decode_server_message(&encode_error(&err)).unwrap()
        else {
            panic!("expected error frame");
        };
        assert_eq!((id, code), (None, PARSE_ERROR));
    }

    #[test]
    fn tick_conversion_maps_timestamp() {
        let tick: Tick = PriceUpdate {
            symbol: "BTCUSDT".into(),
            price: 1.0,
            timestamp: 42,
        }
        .into();
        assert_eq!(tick.timestamp_ms, 42);
        assert_eq!(PriceUpdate::from(tick).timestamp, 42);
    }
}
