//! Column-typed ring-buffer frames
//!
//! A [`RingFrame`] holds at most `capacity` rows. Once full, every append
//! evicts the oldest row first, so memory stays fixed no matter how fast
//! lines arrive.
//!
//! ```text
//!   capacity = 3
//!
//!   append(a)  [a]
//!   append(b)  [a, b]
//!   append(c)  [a, b, c]
//!   append(d)  [b, c, d]     a evicted
//! ```
//!
//! Snapshots share row allocations through `Arc`, so handing a snapshot to
//! every consumer costs one pointer copy per row rather than a deep clone.

pub mod error;
pub mod field;
pub mod ring;
pub mod row;

pub use error::FrameError;
pub use field::{Field, FieldType, Labels};
pub use ring::{FrameSnapshot, RingFrame};
pub use row::{LogRow, Row};

/// Snapshot of a log frame, the shape handed to consumers
pub type LogSnapshot = FrameSnapshot<LogRow>;

/// Ring frame holding log rows
pub type LogFrame = RingFrame<LogRow>;
