//! Fixed-capacity ring frame
//!
//! Rows live in a `VecDeque` sized to the capacity up front; eviction is a
//! `pop_front`, never a shift of the whole buffer.

use std::collections::VecDeque;
use std::sync::Arc;

use super::error::FrameError;
use super::field::{Field, Labels};
use super::row::{LogRow, Row};

/// Fixed-capacity, FIFO-evicting table of rows
#[derive(Debug)]
pub struct RingFrame<R: Row = LogRow> {
    /// Maximum number of rows retained
    capacity: usize,
    /// Frame-level labels, set once at construction
    labels: Arc<Labels>,
    /// Rows, oldest first
    rows: VecDeque<Arc<R>>,
    /// Number of rows evicted since construction
    evicted: u64,
}

impl<R: Row> RingFrame<R> {
    /// Create an empty frame
    ///
    /// Fails with [`FrameError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize, labels: Labels) -> Result<Self, FrameError> {
        if capacity == 0 {
            return Err(FrameError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            labels: Arc::new(labels),
            rows: VecDeque::with_capacity(capacity),
            evicted: 0,
        })
    }

    /// Append a row, evicting the oldest one if the frame is full
    ///
    /// Returns the evicted row, if any.
    pub fn append(&mut self, row: R) -> Option<Arc<R>> {
        let evicted = if self.rows.len() == self.capacity {
            self.evicted += 1;
            self.rows.pop_front()
        } else {
            None
        };

        self.rows.push_back(Arc::new(row));
        evicted
    }

    /// Take an immutable view of the current rows
    ///
    /// Later appends never affect a snapshot that was already returned.
    pub fn snapshot(&self) -> FrameSnapshot<R> {
        FrameSnapshot {
            labels: Arc::clone(&self.labels),
            rows: self.rows.iter().cloned().collect(),
        }
    }

    /// Column descriptors
    pub fn fields(&self) -> &'static [Field] {
        R::fields()
    }

    /// Frame-level labels
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Maximum number of rows
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows currently buffered
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows are buffered
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if the next append will evict
    pub fn is_full(&self) -> bool {
        self.rows.len() == self.capacity
    }

    /// Total rows evicted since construction
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Iterate rows, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().map(|row| row.as_ref())
    }
}

impl RingFrame<LogRow> {
    /// Timestamps of the oldest and newest buffered rows
    pub fn time_range(&self) -> Option<(i64, i64)> {
        let first = self.rows.front()?.time;
        let last = self.rows.back()?.time;
        Some((first, last))
    }
}

/// Immutable view of a frame at one instant
///
/// Cheap to clone: labels and the row sequence are both reference-counted.
#[derive(Debug)]
pub struct FrameSnapshot<R: Row = LogRow> {
    labels: Arc<Labels>,
    rows: Arc<[Arc<R>]>,
}

impl<R: Row> Clone for FrameSnapshot<R> {
    fn clone(&self) -> Self {
        Self {
            labels: Arc::clone(&self.labels),
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<R: Row> FrameSnapshot<R> {
    /// Column descriptors
    pub fn fields(&self) -> &'static [Field] {
        R::fields()
    }

    /// Frame-level labels
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Rows, oldest first
    pub fn rows(&self) -> &[Arc<R>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the snapshot has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Newest row
    pub fn last(&self) -> Option<&R> {
        self.rows.last().map(|row| row.as_ref())
    }

    /// Iterate rows, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().map(|row| row.as_ref())
    }
}
