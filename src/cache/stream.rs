//! Consumer handles
//!
//! A [`LogStream`] is what `get_stream` hands back. Its first event is the
//! frame's state at attach time; after that it sees exactly the events every
//! other consumer of the same URL sees. Dropping the handle detaches it.

use std::sync::Weak;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::frame::LogSnapshot;
use crate::message::MalformedMessage;

use super::error::CacheError;
use super::store::Inner;
use super::target::StreamTarget;

/// Event delivered to consumers
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Frame contents after an append (or at attach time)
    Snapshot(LogSnapshot),
    /// A message was dropped; the stream continues
    Malformed(MalformedMessage),
    /// The connection failed; terminal
    Error(CacheError),
    /// The connection ended; terminal
    Closed,
}

impl StreamEvent {
    /// Check if no events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Closed)
    }
}

/// Consumer handle for one live stream
pub struct LogStream {
    url: String,
    ref_id: String,
    generation: u64,
    /// Attach-time snapshot, yielded before anything from `rx`
    replay: Option<LogSnapshot>,
    rx: broadcast::Receiver<StreamEvent>,
    cache: Weak<Inner>,
    finished: bool,
}

impl LogStream {
    pub(super) fn new(
        target: &StreamTarget,
        generation: u64,
        rx: broadcast::Receiver<StreamEvent>,
        replay: LogSnapshot,
        cache: Weak<Inner>,
    ) -> Self {
        Self {
            url: target.url.clone(),
            ref_id: target.ref_id.clone(),
            generation,
            replay: Some(replay),
            rx,
            cache,
            finished: false,
        }
    }

    /// Wait for the next event
    ///
    /// Returns `None` once a terminal event has been delivered. A consumer
    /// that falls behind by more than the broadcast capacity skips the
    /// missed snapshots; the next one still carries the full frame.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        if let Some(snapshot) = self.replay.take() {
            return Some(StreamEvent::Snapshot(snapshot));
        }

        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    self.finished = event.is_terminal();
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        url = %self.url,
                        ref_id = %self.ref_id,
                        skipped = skipped,
                        "Consumer lagged, skipping stale snapshots"
                    );
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Wait for the next snapshot, skipping diagnostics
    ///
    /// Returns `Err` on connection error and `Ok(None)` once closed.
    pub async fn next_snapshot(&mut self) -> Result<Option<LogSnapshot>, CacheError> {
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Snapshot(snapshot) => return Ok(Some(snapshot)),
                StreamEvent::Malformed(_) => {}
                StreamEvent::Error(e) => return Err(e),
                StreamEvent::Closed => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Endpoint this stream is attached to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Correlation id of the target that requested this stream
    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    /// Generation of the cache entry backing this stream
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check if a terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("url", &self.url)
            .field("ref_id", &self.ref_id)
            .field("generation", &self.generation)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.detach(&self.url, self.generation);
        }
    }
}
