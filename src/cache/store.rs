//! Stream cache implementation
//!
//! The registry that maps URLs to live connections and routes inbound
//! messages through a frame to every attached consumer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::frame::LogFrame;
use crate::message::{LabelParser, SelectorParser};
use crate::transport::{Transport, TransportEvent};

use super::config::{CacheConfig, TeardownPolicy};
use super::entry::{CacheEntry, EntryState, EntryStats};
use super::error::CacheError;
use super::stream::{LogStream, StreamEvent};
use super::target::StreamTarget;

/// Cache of live log streams, one connection per URL
///
/// Owned by a consumer session: dropping the cache tears every connection
/// down and completes every outstanding [`LogStream`].
pub struct StreamCache {
    inner: Arc<Inner>,
}

/// Shared state; consumers and pump tasks hold it weakly
pub(super) struct Inner {
    /// Map of URL to live entry
    entries: Mutex<HashMap<String, Arc<CacheEntry>>>,

    transport: Arc<dyn Transport>,

    parser: Arc<dyn LabelParser>,

    config: CacheConfig,

    next_generation: AtomicU64,
}

/// How a connection ended
enum Outcome {
    Closed,
    Failed(String),
}

impl StreamCache {
    /// Create a cache with default configuration and label parsing
    pub fn new(transport: impl Transport) -> Self {
        Self::with_config(transport, CacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(transport: impl Transport, config: CacheConfig) -> Self {
        Self::with_parser(transport, SelectorParser, config)
    }

    /// Create a cache with a custom label parser
    pub fn with_parser(
        transport: impl Transport,
        parser: impl LabelParser,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                transport: Arc::new(transport),
                parser: Arc::new(parser),
                config,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get a stream for `target`, sharing any live connection to its URL
    ///
    /// Capacity and query are validated first; on error no entry is created
    /// and no connection is opened. Attaching to an existing entry ignores
    /// the target's capacity and query. Must be called from within a Tokio
    /// runtime.
    pub fn get_stream(&self, target: &StreamTarget) -> Result<LogStream, CacheError> {
        if target.capacity == 0 {
            return Err(CacheError::InvalidCapacity(target.capacity));
        }

        let labels = self
            .inner
            .parser
            .parse(&target.query)
            .map_err(|e| CacheError::InvalidQuery {
                query: target.query.clone(),
                reason: e.to_string(),
            })?;

        let mut entries = self.inner.entries.lock();

        if let Some(entry) = entries.get(&target.url) {
            let (rx, replay) = entry.attach();

            tracing::debug!(
                url = %target.url,
                ref_id = %target.ref_id,
                generation = entry.generation,
                subscribers = entry.subscriber_count(),
                rows = replay.len(),
                "Consumer attached (existing stream)"
            );

            return Ok(LogStream::new(
                target,
                entry.generation,
                rx,
                replay,
                Arc::downgrade(&self.inner),
            ));
        }

        let frame = LogFrame::new(target.capacity, labels)
            .map_err(|_| CacheError::InvalidCapacity(target.capacity))?;
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(CacheEntry::new(
            target.url.clone(),
            generation,
            frame,
            self.inner.config.broadcast_capacity,
        ));

        let (rx, replay) = entry.attach();

        let events = self
            .inner
            .transport
            .open(&target.url, self.inner.config.transport_buffer);
        let handle = tokio::spawn(pump(
            Arc::downgrade(&self.inner),
            Arc::clone(&entry),
            events,
            Arc::clone(&self.inner.parser),
            self.inner.config.idle_timeout,
        ));
        entry.set_task(handle.abort_handle());

        // Inserted fully built: the pump can only look it up after we unlock
        entries.insert(target.url.clone(), entry);

        tracing::info!(
            url = %target.url,
            ref_id = %target.ref_id,
            generation = generation,
            capacity = target.capacity,
            "Stream created"
        );

        Ok(LogStream::new(
            target,
            generation,
            rx,
            replay,
            Arc::downgrade(&self.inner),
        ))
    }

    /// Check if a live entry exists for `url`
    pub fn contains(&self, url: &str) -> bool {
        self.inner.entries.lock().contains_key(url)
    }

    /// Get total number of live entries
    pub fn stream_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Get statistics for the entry at `url`
    pub fn stream_stats(&self, url: &str) -> Option<EntryStats> {
        let entry = self.inner.entries.lock().get(url).cloned()?;
        Some(entry.stats())
    }

    /// Tear down the entry at `url`
    ///
    /// Consumers observe `Closed`. Returns `false` if there was no entry.
    pub fn close(&self, url: &str) -> bool {
        let removed = self.inner.entries.lock().remove(url);

        match removed {
            Some(entry) => {
                tracing::info!(url = %url, generation = entry.generation, "Stream closed by cache");
                teardown(&entry);
                true
            }
            None => false,
        }
    }

    /// Tear down every entry
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Drop for StreamCache {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Inner {
    /// Remove `url` only if it still maps to `generation`
    fn remove_if_current(&self, url: &str, generation: u64) -> Option<Arc<CacheEntry>> {
        let mut entries = self.entries.lock();
        if entries.get(url).map(|e| e.generation) == Some(generation) {
            entries.remove(url)
        } else {
            None
        }
    }

    /// Called when a consumer handle is dropped
    pub(super) fn detach(&self, url: &str, generation: u64) {
        let removed = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get(url).filter(|e| e.generation == generation) else {
                // Entry already torn down
                return;
            };

            let remaining = entry.detach();
            tracing::debug!(
                url = %url,
                generation = generation,
                subscribers = remaining,
                "Consumer detached"
            );

            let close = match self.config.teardown {
                TeardownPolicy::RefCounted => remaining == 0,
                TeardownPolicy::FirstDetach => true,
            };
            if !close {
                return;
            }
            entries.remove(url)
        };

        if let Some(entry) = removed {
            tracing::info!(
                url = %url,
                generation = generation,
                subscribers = entry.subscriber_count(),
                "Stream closed after detach"
            );
            teardown(&entry);
        }
    }

    /// Handle the end of a connection reported by the pump
    fn finish(&self, entry: &CacheEntry, outcome: Outcome) {
        // Someone else already tore the entry down and notified consumers
        if self.remove_if_current(&entry.url, entry.generation).is_none() {
            return;
        }

        match outcome {
            Outcome::Closed => {
                tracing::info!(url = %entry.url, generation = entry.generation, "Stream closed by remote");
                entry.terminate(EntryState::Closed, StreamEvent::Closed);
            }
            Outcome::Failed(reason) => {
                tracing::warn!(
                    url = %entry.url,
                    generation = entry.generation,
                    error = %reason,
                    "Stream failed"
                );
                let error = CacheError::ConnectionError {
                    url: entry.url.clone(),
                    reason,
                };
                entry.terminate(EntryState::Errored, StreamEvent::Error(error));
            }
        }
    }

    fn shutdown(&self) {
        let drained: Vec<_> = self.entries.lock().drain().map(|(_, e)| e).collect();

        if !drained.is_empty() {
            tracing::info!(streams = drained.len(), "Stream cache shutting down");
        }
        for entry in drained {
            teardown(&entry);
        }
    }
}

/// Stop an entry that has already been removed from the map
fn teardown(entry: &CacheEntry) {
    entry.abort();
    entry.terminate(EntryState::Closed, StreamEvent::Closed);
}

/// Drive one connection: transport events in, frame updates out
async fn pump(
    cache: Weak<Inner>,
    entry: Arc<CacheEntry>,
    mut events: mpsc::Receiver<TransportEvent>,
    parser: Arc<dyn LabelParser>,
    idle_timeout: Option<Duration>,
) {
    let outcome = loop {
        let event = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, events.recv()).await {
                Ok(event) => event,
                Err(_) => break Outcome::Failed(format!("idle for {:?}", limit)),
            },
            None => events.recv().await,
        };

        match event {
            Some(TransportEvent::Open) => entry.mark_streaming(),
            Some(TransportEvent::Message(payload)) => {
                entry.mark_streaming();
                let received_at = chrono::Utc::now().timestamp_millis();
                entry.ingest(&payload, parser.as_ref(), received_at);
            }
            Some(TransportEvent::Error(reason)) => break Outcome::Failed(reason),
            Some(TransportEvent::Closed) => break Outcome::Closed,
            None => break Outcome::Failed("transport ended without close".into()),
        }
    };

    // Receiver goes first so the transport can release its socket
    drop(events);

    if let Some(cache) = cache.upgrade() {
        cache.finish(&entry, outcome);
    }
}
