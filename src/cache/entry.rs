//! Cache entry and state types
//!
//! This module defines the per-URL state stored in the cache: the shared
//! frame, the broadcast channel consumers hang off, and bookkeeping.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::frame::{LogFrame, LogSnapshot};
use crate::message::{apply_message, LabelParser};

use super::stream::StreamEvent;

/// State of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Transport opened, nothing received yet
    Connecting,
    /// Connection established
    Streaming,
    /// Closed remotely, by detach, or by the cache
    Closed,
    /// Connection failed
    Errored,
}

/// Entry for a single URL in the cache
pub(super) struct CacheEntry {
    /// Cache key
    pub url: String,

    /// Distinguishes this entry from earlier/later entries for the same URL
    pub generation: u64,

    /// Buffered rows; only the pump task appends
    frame: Mutex<LogFrame>,

    /// Fan-out to consumers
    tx: broadcast::Sender<StreamEvent>,

    /// Attached consumers; only changed under the cache map lock
    subscriber_count: AtomicUsize,

    state: Mutex<EntryState>,

    /// Handle to the pump task driving this entry's connection
    task: Mutex<Option<AbortHandle>>,

    messages_applied: AtomicU64,
    rows_appended: AtomicU64,
    malformed_messages: AtomicU64,
    dropped_entries: AtomicU64,

    created_at: Instant,
}

impl CacheEntry {
    /// Create a new entry around an empty frame
    pub fn new(url: String, generation: u64, frame: LogFrame, broadcast_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity);

        Self {
            url,
            generation,
            frame: Mutex::new(frame),
            tx,
            subscriber_count: AtomicUsize::new(0),
            state: Mutex::new(EntryState::Connecting),
            task: Mutex::new(None),
            messages_applied: AtomicU64::new(0),
            rows_appended: AtomicU64::new(0),
            malformed_messages: AtomicU64::new(0),
            dropped_entries: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    /// Attach a consumer
    ///
    /// Snapshot and subscription are taken under the frame lock, so the
    /// consumer sees every update after the snapshot exactly once.
    pub fn attach(&self) -> (broadcast::Receiver<StreamEvent>, LogSnapshot) {
        let frame = self.frame.lock();
        let rx = self.tx.subscribe();
        let snapshot = frame.snapshot();
        drop(frame);

        self.subscriber_count.fetch_add(1, Ordering::Relaxed);
        (rx, snapshot)
    }

    /// Detach a consumer, returning how many remain
    pub fn detach(&self) -> usize {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
        prev.saturating_sub(1)
    }

    /// Get the number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> EntryState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: EntryState) {
        *self.state.lock() = state;
    }

    /// Move from `Connecting` to `Streaming`; later states are left alone
    pub fn mark_streaming(&self) {
        let mut state = self.state.lock();
        if *state == EntryState::Connecting {
            *state = EntryState::Streaming;
            tracing::debug!(url = %self.url, generation = self.generation, "Stream connected");
        }
    }

    pub fn set_task(&self, handle: AbortHandle) {
        *self.task.lock() = Some(handle);
    }

    /// Stop the pump task, which drops the transport receiver
    pub fn abort(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Apply one inbound payload and publish the result
    ///
    /// A successful append publishes one snapshot; a malformed payload
    /// publishes a diagnostic and leaves the frame untouched.
    pub fn ingest(&self, payload: &[u8], parser: &dyn LabelParser, received_at: i64) {
        let mut frame = self.frame.lock();
        let result = apply_message(payload, &mut frame, parser, received_at);

        match result {
            Ok(applied) => {
                self.messages_applied.fetch_add(1, Ordering::Relaxed);
                if applied.dropped > 0 {
                    self.dropped_entries
                        .fetch_add(applied.dropped as u64, Ordering::Relaxed);
                    tracing::debug!(
                        url = %self.url,
                        dropped = applied.dropped,
                        "Server reported dropped entries"
                    );
                }
                if applied.rows == 0 {
                    return;
                }

                self.rows_appended
                    .fetch_add(applied.rows as u64, Ordering::Relaxed);
                // Published under the frame lock so attach cannot interleave
                let receivers = self.send(StreamEvent::Snapshot(frame.snapshot()));
                tracing::trace!(
                    url = %self.url,
                    rows = applied.rows,
                    receivers = receivers,
                    "Snapshot published"
                );
            }
            Err(malformed) => {
                drop(frame);
                self.malformed_messages.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    url = %self.url,
                    error = %malformed,
                    "Dropping malformed message"
                );
                self.send(StreamEvent::Malformed(malformed));
            }
        }
    }

    /// Deliver a terminal event to every consumer
    pub fn terminate(&self, state: EntryState, event: StreamEvent) {
        self.set_state(state);
        let receivers = self.send(event);
        tracing::debug!(
            url = %self.url,
            generation = self.generation,
            receivers = receivers,
            "Terminal event delivered"
        );
    }

    /// Send an event to all consumers
    ///
    /// Returns the number of receivers, 0 if none are attached.
    pub fn send(&self, event: StreamEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn stats(&self) -> EntryStats {
        let frame = self.frame.lock();
        EntryStats {
            generation: self.generation,
            state: self.state(),
            subscriber_count: self.subscriber_count(),
            buffered_rows: frame.len(),
            capacity: frame.capacity(),
            evicted_rows: frame.evicted(),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            rows_appended: self.rows_appended.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            dropped_entries: self.dropped_entries.load(Ordering::Relaxed),
            age: self.created_at.elapsed(),
        }
    }
}

/// Statistics for a cache entry
#[derive(Debug, Clone)]
pub struct EntryStats {
    /// Entry generation
    pub generation: u64,
    /// Current entry state
    pub state: EntryState,
    /// Number of attached consumers
    pub subscriber_count: usize,
    /// Rows currently in the frame
    pub buffered_rows: usize,
    /// Frame capacity
    pub capacity: usize,
    /// Rows evicted by the ring so far
    pub evicted_rows: u64,
    /// Well-formed messages applied
    pub messages_applied: u64,
    /// Rows appended across all messages
    pub rows_appended: u64,
    /// Messages dropped as malformed
    pub malformed_messages: u64,
    /// Entries the server reported as dropped
    pub dropped_entries: u64,
    /// Time since the entry was created
    pub age: Duration,
}
