//! Message and label error types

/// An inbound message that could not be turned into rows
///
/// Non-terminal: the message is dropped and the frame is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedMessage {
    /// What was wrong with the payload
    pub reason: String,
}

impl MalformedMessage {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for MalformedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Malformed message: {}", self.reason)
    }
}

impl std::error::Error for MalformedMessage {}

impl From<serde_json::Error> for MalformedMessage {
    fn from(e: serde_json::Error) -> Self {
        MalformedMessage::new(e.to_string())
    }
}

/// Failure to parse a label selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParseError {
    /// Byte offset into the input where parsing stopped
    pub position: usize,
    /// What the parser expected
    pub reason: String,
}

impl LabelParseError {
    pub(crate) fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for LabelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.reason, self.position)
    }
}

impl std::error::Error for LabelParseError {}
