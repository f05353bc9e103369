//! Client for the relay's WebSocket RPC surface.
//!
//! Used by the feed bridge and the `watch` command, and by the end-to-end
//! tests.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::wire::{self, PriceRequest, PriceUpdate, ServerMessage};

type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STREAM_BUFFER: usize = 256;

pub struct RelayClient {
    write: SplitSink<ClientWs, Message>,
    read: SplitStream<ClientWs>,
    next_id: u64,
}

impl RelayClient {
    /// Connect to a relay at `url`, e.g. `ws://127.0.0.1:50051`.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (ws, _) = connect_async(url).await?;
        let (write, read) = ws.split();
        debug!(url, "connected to relay");

        Ok(Self {
            write,
            read,
            next_id: 1,
        })
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send one tick and wait for the server's acknowledgement.
    pub async fn send_price(&mut self, update: &PriceUpdate) -> Result<(), ClientError> {
        let id = self.take_id();
        let frame = wire::encode_send_price(id, update);
        self.write.send(Message::Text(frame.into())).await?;

        while let Some(msg) = self.read.next().await {
            let text = match msg? {
                Message::Text(text) => text,
                Message::Close(_) => return Err(ClientError::Closed),
                _ => continue,
            };

            match wire::decode_server_message(text.as_str())? {
                ServerMessage::Ack { id: Some(acked) } if acked == id => return Ok(()),
                ServerMessage::Error { code, message, .. } => {
                    return Err(ClientError::Rpc { code, message });
                }
                other => debug!(?other, "skipping unrelated frame"),
            }
        }

        Err(ClientError::Closed)
    }

    /// Turn this connection into a price stream for `symbols`.
    pub async fn stream_prices(mut self, symbols: Vec<String>) -> Result<PriceStream, ClientError> {
        let id = self.take_id();
        let frame = wire::encode_stream_prices(id, &PriceRequest { symbols });
        self.write.send(Message::Text(frame.into())).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_stream(self.write, self.read, tx, cancel.clone()));

        Ok(PriceStream {
            rx,
            cancel,
            task: Some(task),
        })
    }
}

/// Forward `PriceUpdate` notifications until the server ends the call, the
/// socket drops, or the consumer cancels.
async fn pump_stream(
    mut write: SplitSink<ClientWs, Message>,
    mut read: SplitStream<ClientWs>,
    tx: mpsc::Sender<PriceUpdate>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = read.next() => msg,
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "price stream read failed");
                return;
            }
        };

        match wire::decode_server_message(text.as_str()) {
            Ok(ServerMessage::Update(update)) => {
                let delivered = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    res = tx.send(update) => res.is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            // the server completed the call
            Ok(ServerMessage::Ack { .. }) => return,
            Ok(ServerMessage::Error { code, message, .. }) => {
                warn!(code, %message, "stream rejected by server");
                return;
            }
            Err(e) => warn!(error = %e, "undecodable frame on price stream"),
        }
    }

    let _ = write.send(Message::Close(None)).await;
}

/// Receiving half of a `StreamPrices` call. Dropping it cancels the call.
pub struct PriceStream {
    rx: mpsc::Receiver<PriceUpdate>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PriceStream {
    /// Next update, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<PriceUpdate> {
        self.rx.recv().await
    }

    /// Cancel the call and wait for the close frame to go out.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PriceStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
