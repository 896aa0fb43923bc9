//! Cache error types

/// Error type for stream cache operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Requested buffer size is zero
    InvalidCapacity(usize),
    /// Query labels could not be parsed
    InvalidQuery {
        /// The offending query text
        query: String,
        /// Parser message
        reason: String,
    },
    /// Transport failure; terminal for the entry
    ConnectionError {
        /// Endpoint of the failed connection
        url: String,
        /// Transport message
        reason: String,
    },
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::InvalidCapacity(capacity) => {
                write!(f, "Invalid capacity: {} (must be > 0)", capacity)
            }
            CacheError::InvalidQuery { query, reason } => {
                write!(f, "Invalid query {:?}: {}", query, reason)
            }
            CacheError::ConnectionError { url, reason } => {
                write!(f, "Connection error on {}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for CacheError {}
