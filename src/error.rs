//! Crate-level error type
//!
//! Each subsystem owns a narrow error enum; [`Error`] unifies them so callers
//! can use `?` across module boundaries.

use crate::cache::CacheError;
use crate::frame::FrameError;
use crate::message::{LabelParseError, MalformedMessage};

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug)]
pub enum Error {
    /// Stream cache failure (creation-time or connection-level)
    Cache(CacheError),
    /// Frame construction failure
    Frame(FrameError),
    /// Inbound message could not be decoded
    Malformed(MalformedMessage),
    /// Query text could not be turned into labels
    Labels(LabelParseError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Cache(e) => write!(f, "Cache error: {}", e),
            Error::Frame(e) => write!(f, "Frame error: {}", e),
            Error::Malformed(e) => write!(f, "{}", e),
            Error::Labels(e) => write!(f, "Label parse error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Cache(e) => Some(e),
            Error::Frame(e) => Some(e),
            Error::Malformed(e) => Some(e),
            Error::Labels(e) => Some(e),
        }
    }
}

impl From<CacheError> for Error {
    fn from(e: CacheError) -> Self {
        Error::Cache(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

impl From<MalformedMessage> for Error {
    fn from(e: MalformedMessage) -> Self {
        Error::Malformed(e)
    }
}

impl From<LabelParseError> for Error {
    fn from(e: LabelParseError) -> Self {
        Error::Labels(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{StreamCache, StreamTarget};
    use crate::frame::{Labels, LogFrame};
    use crate::message::{apply_message, LabelParser, SelectorParser};
    use crate::transport::MemoryTransport;

    fn new_frame(capacity: usize) -> Result<LogFrame> {
        Ok(LogFrame::new(capacity, Labels::new())?)
    }

    fn parse(query: &str) -> Result<Labels> {
        Ok(SelectorParser.parse(query)?)
    }

    fn apply(payload: &[u8]) -> Result<usize> {
        let mut frame = new_frame(4)?;
        Ok(apply_message(payload, &mut frame, &SelectorParser, 0)?.rows)
    }

    #[test]
    fn test_public_errors_convert() {
        assert!(matches!(new_frame(0), Err(Error::Frame(_))));
        assert!(matches!(parse(r#"{job="api""#), Err(Error::Labels(_))));
        assert!(matches!(apply(b"{"), Err(Error::Malformed(_))));
        assert_eq!(apply(br#"{"streams":[{"entries":[{"line":"x"}]}]}"#).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_error_converts() {
        let cache = StreamCache::new(MemoryTransport::new());
        let open = |capacity| -> Result<()> {
            cache.get_stream(&StreamTarget::new("mem://a", "", capacity))?;
            Ok(())
        };

        let err = open(0).unwrap_err();
        assert!(matches!(err, Error::Cache(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(open(1).is_ok());
    }
}
