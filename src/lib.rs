//! Live log-stream cache
//!
//! Multiplexes continuously arriving log lines from long-lived connections
//! into bounded, column-typed frames and fans snapshots of those frames out
//! to every consumer of the same stream.
//!
//! # Example
//! ```no_run
//! use logtail_cache::cache::{StreamCache, StreamEvent, StreamTarget};
//! use logtail_cache::transport::TcpTransport;
//!
//! # async fn example() -> logtail_cache::error::Result<()> {
//! let cache = StreamCache::new(TcpTransport::new());
//! let target = StreamTarget::new("tcp://127.0.0.1:9000", r#"{job="api"}"#, 500);
//!
//! let mut stream = cache.get_stream(&target)?;
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::Snapshot(snapshot) = event {
//!         println!("{} rows buffered", snapshot.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod frame;
pub mod message;
pub mod transport;

pub use cache::{CacheConfig, LogStream, StreamCache, StreamEvent, StreamTarget};
pub use error::{Error, Result};
pub use frame::{FrameSnapshot, Labels, LogRow, RingFrame};
