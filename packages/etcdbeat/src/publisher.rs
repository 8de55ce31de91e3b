use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

use crate::{errors::PublishError, model::Event};

/// The publishing contract used by the poll loop.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_event(&self, event: Event) -> Result<(), PublishError>;
    /// Releases the transport. Events published afterwards are rejected.
    async fn close(&self);
}

/// Hands events to a `PublishService` over an mpsc channel, so the poll loop never waits on the sink.
pub struct ChannelPublisher {
    tx: Mutex<Option<mpsc::Sender<Event>>>,
}

impl ChannelPublisher {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx: Mutex::new(Some(tx)) }
    }

    fn sender(&self) -> Option<mpsc::Sender<Event>> {
        self.tx.lock().ok().and_then(|tx| tx.as_ref().cloned())
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish_event(&self, event: Event) -> Result<(), PublishError> {
        let Some(tx) = self.sender() else {
            return Err(PublishError {
                reason: "publisher is closed".to_owned(),
            });
        };
        tx.send(event).await.map_err(|e| PublishError {
            reason: format!("publish channel closed, dropped {} event", e.0.category()),
        })
    }

    async fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        debug!("Publisher closed");
    }
}

/// Drains published events into a sink as one JSON document per line.
pub struct PublishService<W: AsyncWrite + Unpin + Send> {
    rx: mpsc::Receiver<Event>,
    sink: W,
}

impl<W: AsyncWrite + Unpin + Send> PublishService<W> {
    pub fn new(rx: mpsc::Receiver<Event>, sink: W) -> Self {
        Self { rx, sink }
    }

    /// Runs until every sender is gone. Returns the number of events written.
    pub async fn run(mut self) -> (usize, W) {
        let mut written = 0;
        while let Some(event) = self.rx.recv().await {
            match serde_json::to_vec(&event) {
                Ok(mut line) => {
                    line.push(b'\n');
                    if let Err(e) = self.sink.write_all(&line).await {
                        error!("Failed to write {} event to sink: {}", event.category(), e);
                        continue;
                    }
                    written += 1;
                }
                Err(e) => error!("Failed to encode {} event: {}", event.category(), e),
            }
        }
        if let Err(e) = self.sink.flush().await {
            error!("Failed to flush event sink: {}", e);
        }
        info!("Publish service stopped after writing {} events", written);
        (written, self.sink)
    }
}
