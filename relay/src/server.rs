//! WebSocket transport for [`MarketDataService`].
//!
//! One task per connection. A connection serves any number of `SendPrice`
//! calls; a `StreamPrices` call takes the connection over until the client
//! closes it or the server shuts down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::logger::{TraceId, call_span, connection_span};
use dispatcher::{CancelReason, SinkError, UpdateSink};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use market::Tick;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::config::RelayConfig;
use crate::error::WireError;
use crate::service::MarketDataService;
use crate::wire::{self, PriceRequest, PriceUpdate, Request};

type ServerWs = WebSocketStream<TcpStream>;
type WsWriter = SplitSink<ServerWs, Message>;
type WsReader = SplitStream<ServerWs>;

/// Budget for the final frames written to a peer once shutdown has begun.
const SHUTDOWN_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// How long `run` waits for connection tasks after shutdown before aborting them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes streamed ticks as `PriceUpdate` notifications.
struct WsUpdateSink {
    write: WsWriter,
}

#[async_trait]
impl UpdateSink for WsUpdateSink {
    async fn send(&mut self, update: Tick) -> Result<(), SinkError> {
        let frame = wire::encode_update(&PriceUpdate::from(update));
        self.write
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}

pub struct RelayServer {
    listener: TcpListener,
    service: Arc<MarketDataService>,
    shutdown: CancellationToken,
}

impl RelayServer {
    pub async fn bind(addr: &str, service: Arc<MarketDataService>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            shutdown: CancellationToken::new(),
        })
    }

    /// Bind using the listen address and component settings from `cfg`.
    pub async fn from_config(cfg: &RelayConfig) -> std::io::Result<Self> {
        let service = Arc::new(MarketDataService::from_config(cfg));
        Self::bind(&cfg.listen_addr, service).await
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn service(&self) -> Arc<MarketDataService> {
        Arc::clone(&self.service)
    }

    /// Cancelling this token stops the accept loop and ends every active
    /// stream with a normal completion.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accept connections until shutdown, then drain the connection tasks.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.listener.local_addr()?;
        info!(%addr, "relay listening");

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let trace_id = TraceId::new();
                        let span = connection_span(&trace_id, peer);
                        let service = Arc::clone(&self.service);
                        let shutdown = self.shutdown.clone();

                        connections.spawn(
                            async move {
                                debug!("connection accepted");
                                if let Err(e) = handle_connection(stream, service, shutdown).await {
                                    debug!(error = %e, "connection ended with error");
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "connection task panicked");
                    }
                }
            }
        }

        info!(active = connections.len(), "shutdown requested, draining connections");
        let drained = timeout(DRAIN_TIMEOUT, async {
            while let Some(joined) = connections.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "connection task panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                "connections did not drain in time, aborting"
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
        info!("relay stopped");

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    service: Arc<MarketDataService>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let ws = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            debug!("shutdown before websocket handshake completed");
            return Ok(());
        }
        ws = accept_async(stream) => ws?,
    };
    let (mut write, mut read) = ws.split();

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            msg = read.next() => msg,
        };

        let Some(msg) = next else { break };
        let text = match msg? {
            Message::Text(text) => text,
            Message::Binary(_) => {
                let err = WireError::UnsupportedFrame("binary");
                write.send(Message::Text(wire::encode_error(&err).into())).await?;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };

        match wire::decode_request(text.as_str()) {
            Ok(req) => {
                let span = call_span(req.method(), req.id());
                match req {
                    Request::SendPrice { id, update } => {
                        span.in_scope(|| service.send_price(update));
                        write
                            .send(Message::Text(wire::encode_ack(id.as_ref()).into()))
                            .await?;
                    }
                    Request::StreamPrices { id, request } => {
                        return serve_stream(&service, id, request, write, read, &shutdown)
                            .instrument(span)
                            .await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "rejecting frame");
                write.send(Message::Text(wire::encode_error(&e).into())).await?;
            }
        }
    }

    let _ = timeout(SHUTDOWN_WRITE_TIMEOUT, write.close()).await;
    Ok(())
}

/// Run one streaming call to completion on this connection.
async fn serve_stream(
    service: &MarketDataService,
    id: Option<Value>,
    request: PriceRequest,
    write: WsWriter,
    mut read: WsReader,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let call = shutdown.child_token();

    // The client cancels by closing the socket; nothing else is read.
    let watcher = {
        let call = call.clone();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => debug!("ignoring frame on streaming connection"),
                }
            }
            call.cancel();
        })
    };

    let mut sink = WsUpdateSink { write };
    let report = service.stream_prices(request, &mut sink, &call).await;
    watcher.abort();

    if shutdown.is_cancelled() && report.reason == CancelReason::Cancelled {
        // Server-side end of stream: complete the call, then close. A peer
        // that stopped reading gets neither.
        let finish = async {
            sink.write
                .send(Message::Text(wire::encode_ack(id.as_ref()).into()))
                .await?;
            sink.write.close().await
        };
        if let Err(e) = timeout(SHUTDOWN_WRITE_TIMEOUT, finish).await {
            debug!(error = %e, "peer not reading, dropping stream without final ack");
        }
    }

    Ok(())
}
