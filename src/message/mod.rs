//! Inbound message handling
//!
//! Decodes push messages from the transport and turns them into frame rows.

pub mod appender;
pub mod error;
pub mod labels;
pub mod wire;

pub use appender::{apply_message, decode_rows, Applied};
pub use error::{LabelParseError, MalformedMessage};
pub use labels::{LabelParser, SelectorParser};
pub use wire::{PushEntry, PushMessage, PushStream, WireLabels, WireTimestamp};
