//! Frame error types

/// Error type for frame construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Capacity must be at least one row
    InvalidCapacity(usize),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::InvalidCapacity(capacity) => {
                write!(f, "Invalid frame capacity: {} (must be > 0)", capacity)
            }
        }
    }
}

impl std::error::Error for FrameError {}
