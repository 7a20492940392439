//! The `{success, message}` response envelope.
//!
//! Every call that reaches the command layer answers with exactly one
//! envelope. Only transport-level faults (malformed JSON, unknown method,
//! wrong argument types) bypass it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::bridge::command::Outcome;
use crate::error::CommandError;

/// Separator used when an envelope is built from several message lines.
pub const MESSAGE_SEPARATOR: &str = "; ";

/// Source text for an envelope message: one string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Stored verbatim.
    Single(String),
    /// Joined with [`MESSAGE_SEPARATOR`].
    Lines(Vec<String>),
}

impl Message {
    fn into_text(self) -> String {
        match self {
            Self::Single(text) => text,
            Self::Lines(lines) => lines.join(MESSAGE_SEPARATOR),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Single(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Single(text)
    }
}

impl From<Vec<String>> for Message {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

impl<const N: usize> From<[&str; N]> for Message {
    fn from(lines: [&str; N]) -> Self {
        Self::Lines(lines.iter().map(ToString::to_string).collect())
    }
}

/// The wire-level response of every bridge method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the command succeeded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    /// Human-readable result or failure reason.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// A `null` field reads the same as a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Creates an envelope, joining multi-line messages.
    pub fn new(success: bool, message: impl Into<Message>) -> Self {
        Self {
            success,
            message: message.into().into_text(),
        }
    }

    /// Creates a success envelope.
    pub fn ok(message: impl Into<Message>) -> Self {
        Self::new(true, message)
    }

    /// Creates a failure envelope.
    pub fn failure(message: impl Into<Message>) -> Self {
        Self::new(false, message)
    }

    /// Reads an envelope from a reply value.
    ///
    /// Missing or `null` fields take their defaults (`false`, `""`). Returns
    /// `None` if the value is not an object or a field has the wrong type.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Renders the envelope as agent-facing text.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!(
            "{}: {}",
            if self.success { "OK" } else { "ERROR" },
            self.message
        )
    }
}

impl From<Result<Outcome, CommandError>> for Envelope {
    fn from(result: Result<Outcome, CommandError>) -> Self {
        match result {
            Ok(outcome) => Self::ok(outcome.into_message()),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
