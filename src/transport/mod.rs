//! Duplex connection transports
//!
//! A transport turns a URL into a stream of [`TransportEvent`]s delivered
//! over an mpsc channel. The cache owns the receiving half; dropping it is
//! the close signal, and a transport must release its socket once it sees
//! the receiver gone.
//!
//! ```text
//!   Transport::open(url) ──► mpsc::Receiver<TransportEvent>
//!                               │
//!                               ▼
//!                     Open, Message, Message, ..., Closed | Error
//! ```

pub mod memory;
pub mod tcp;

use bytes::Bytes;
use tokio::sync::mpsc;

pub use memory::{MemorySender, MemoryTransport};
pub use tcp::{TcpTransport, TcpTransportConfig};

/// Event produced by a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Open,
    /// One framed message payload
    Message(Bytes),
    /// Transport-level failure; no further events follow
    Error(String),
    /// Orderly remote close; no further events follow
    Closed,
}

/// Opens live connections
pub trait Transport: Send + Sync + 'static {
    /// Start connecting to `url`
    ///
    /// Must not block: connection work happens in the background and is
    /// reported through the returned receiver, whose channel holds at most
    /// `buffer` undelivered events.
    fn open(&self, url: &str, buffer: usize) -> mpsc::Receiver<TransportEvent>;
}
