//! In-process transport
//!
//! Every `open` creates a fresh channel for the URL and keeps the producing
//! half, which callers fetch with [`MemoryTransport::sender`]. Useful when log
//! lines originate inside the same process, and for driving the cache
//! deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Transport, TransportEvent};

#[derive(Debug, Default)]
struct Endpoint {
    /// Producer for the most recent connection
    sender: Option<mpsc::Sender<TransportEvent>>,
    /// Connection attempts so far
    opens: usize,
}

/// Channel-backed transport
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    endpoints: Arc<Mutex<HashMap<String, Endpoint>>>,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer for the latest connection to `url`
    ///
    /// Returns `None` if `url` was never opened.
    pub fn sender(&self, url: &str) -> Option<MemorySender> {
        let endpoints = self.endpoints.lock();
        endpoints
            .get(url)
            .and_then(|ep| ep.sender.clone())
            .map(|tx| MemorySender { tx })
    }

    /// Number of times `url` has been opened
    pub fn open_count(&self, url: &str) -> usize {
        self.endpoints.lock().get(url).map_or(0, |ep| ep.opens)
    }

    /// Check if the latest connection to `url` still has a live consumer
    pub fn is_connected(&self, url: &str) -> bool {
        self.endpoints
            .lock()
            .get(url)
            .and_then(|ep| ep.sender.as_ref())
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &str, buffer: usize) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let mut endpoints = self.endpoints.lock();
        let endpoint = endpoints.entry(url.to_string()).or_default();
        endpoint.sender = Some(tx);
        endpoint.opens += 1;

        tracing::trace!(url = %url, opens = endpoint.opens, "Memory stream opened");
        rx
    }
}

/// Producing half of an in-process connection
///
/// Each method returns `false` once the consumer side is gone.
#[derive(Debug, Clone)]
pub struct MemorySender {
    tx: mpsc::Sender<TransportEvent>,
}

impl MemorySender {
    /// Signal that the connection is established
    pub async fn open(&self) -> bool {
        self.send(TransportEvent::Open).await
    }

    /// Deliver one message payload
    pub async fn message(&self, payload: impl Into<Bytes>) -> bool {
        self.send(TransportEvent::Message(payload.into())).await
    }

    /// Fail the connection
    pub async fn error(&self, reason: impl Into<String>) -> bool {
        self.send(TransportEvent::Error(reason.into())).await
    }

    /// Close the connection in an orderly way
    pub async fn close(&self) -> bool {
        self.send(TransportEvent::Closed).await
    }

    /// Check if the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, event: TransportEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}
