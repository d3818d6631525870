//! Result descriptors delivered for every logical operation

use std::fmt;

use serde::{Serialize, Serializer};

use crate::engine::TxMode;
use crate::record::Key;

/// Message shown when the engine reports it is unavailable.
pub const NOT_SUPPORTED_MESSAGE: &str =
    "Your environment doesn't support a stable version of the object store.";

/// Operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Record value, report text, database/store name, or status token
    Text(String),
    /// Echoed key (not-found lookups, deletes)
    Key(Key),
    /// Record count or report length
    Count(usize),
    /// No payload (capability absence, empty bulk insert)
    Empty,
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            Value::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Value::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Key(k) => write!(f, "{}", k),
            Value::Count(n) => write!(f, "{}", n),
            Value::Empty => Ok(()),
        }
    }
}

/// Operation tag. Its display text is stable; callers branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    NotSupported,
    DatabaseCreated,
    StoreCreated,
    DatabaseDeleted,
    Added,
    AddedTestData(usize),
    Found,
    FoundByIndex,
    NotFound,
    Total,
    Size,
    AllFound,
    Deleted,
    AllRemoved,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::NotSupported => f.write_str(NOT_SUPPORTED_MESSAGE),
            Message::DatabaseCreated => f.write_str("Created Database"),
            Message::StoreCreated => f.write_str("Created Store"),
            Message::DatabaseDeleted => f.write_str("Deleted Database"),
            Message::Added => f.write_str("Added Data"),
            Message::AddedTestData(n) => write!(f, "Added {} Test Data objects.", n),
            Message::Found => f.write_str("Got Data"),
            Message::FoundByIndex => f.write_str("Got Data by Index."),
            Message::NotFound => f.write_str("Data not found."),
            Message::Total => f.write_str("Total Objects"),
            Message::Size => f.write_str("Size"),
            Message::AllFound => f.write_str("All Data Found:"),
            Message::Deleted => f.write_str("Deleted Data"),
            Message::AllRemoved => f.write_str("All Data Removed"),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where an outcome came from. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Context {
    pub database: String,
    pub store: String,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<TxMode>,
}

/// Uniform result of a logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub value: Value,
    pub message: Message,
    pub context: Context,
}

impl Outcome {
    pub fn is_not_found(&self) -> bool {
        self.message == Message::NotFound
    }

    pub fn is_not_supported(&self) -> bool {
        self.message == Message::NotSupported
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.message, self.value)
    }
}
