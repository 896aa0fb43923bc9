//! Field descriptors and label sets

use std::collections::BTreeMap;

/// Label mapping attached to frames and rows
///
/// Ordered so that hashing and display are stable across runs.
pub type Labels = BTreeMap<String, String>;

/// Type of a frame column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Epoch milliseconds
    Time,
    /// UTF-8 text
    String,
    /// Opaque structured value (label maps)
    Other,
}

/// Column descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Column name as seen by consumers
    pub name: &'static str,
    /// Column type
    pub field_type: FieldType,
    /// Optional display title
    pub title: Option<&'static str>,
}

impl Field {
    /// Create an untitled field
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            title: None,
        }
    }

    /// Set the display title
    pub const fn titled(self, title: &'static str) -> Self {
        Self {
            title: Some(title),
            ..self
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.name, self.field_type)
    }
}
