//! Stream cache for live log tails
//!
//! The cache keeps one live connection per URL and fans frame snapshots out
//! to every consumer attached to it. It uses `tokio::sync::broadcast` so all
//! consumers of an entry observe the same sequence of events.
//!
//! # Architecture
//!
//! ```text
//!                            StreamCache
//!                     ┌─────────────────────────┐
//!                     │ entries: HashMap<url,   │
//!                     │   CacheEntry {          │
//!                     │     frame: RingFrame,   │
//!                     │     tx: broadcast::Tx,  │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [pump task]             [LogStream]             [LogStream]
//!    transport.recv()        stream.next()           stream.next()
//!         │                       ▲                       ▲
//!         └──► apply_message() ──► snapshot ──────────────┘
//! ```
//!
//! # Lifecycle
//!
//! An entry is created on the first `get_stream` for its URL and removed
//! exactly once: on transport error, on remote close, when consumers detach
//! (per [`TeardownPolicy`]), or when the cache itself is closed or dropped.
//! The next `get_stream` for the same URL opens a new connection with an
//! empty frame.
//!
//! # Sharing
//!
//! Snapshots share row allocations through `Arc`; fanning a snapshot out to
//! N consumers clones N pointers, not N frames.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod stream;
pub mod target;

pub use config::{CacheConfig, TeardownPolicy};
pub use entry::{EntryState, EntryStats};
pub use error::CacheError;
pub use store::StreamCache;
pub use stream::{LogStream, StreamEvent};
pub use target::StreamTarget;
