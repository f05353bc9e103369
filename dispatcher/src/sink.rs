use async_trait::async_trait;
use market::Tick;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("update receiver closed")]
    Closed,

    #[error("transport write failed: {0}")]
    Transport(String),
}

/// Outbound half of a streaming call.
///
/// `send` may apply backpressure; the dispatcher awaits it and treats any
/// error as the client having gone away.
#[async_trait]
pub trait UpdateSink: Send {
    async fn send(&mut self, update: Tick) -> Result<(), SinkError>;
}

#[async_trait]
impl UpdateSink for mpsc::Sender<Tick> {
    async fn send(&mut self, update: Tick) -> Result<(), SinkError> {
        mpsc::Sender::send(self, update)
            .await
            .map_err(|_| SinkError::Closed)
    }
}
