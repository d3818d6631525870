//! Record and key types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a record.
///
/// Integers sort before strings, integers numerically and strings
/// lexicographically. This is the key order every engine scans in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Int(n.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

/// A keyed record: the primary key plus the indexed `value` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Key,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<Key>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_sort_before_strings() {
        let mut keys = vec![
            Key::from("b"),
            Key::from(10),
            Key::from("a"),
            Key::from(-3),
            Key::from(2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::Int(-3),
                Key::Int(2),
                Key::Int(10),
                Key::Text("a".into()),
                Key::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from(42).to_string(), "42");
        assert_eq!(Key::from("alpha").to_string(), "alpha");
    }

    #[test]
    fn test_key_serde_untagged() {
        let int: Key = serde_json::from_str("7").unwrap();
        let text: Key = serde_json::from_str("\"seven\"").unwrap();
        assert_eq!(int, Key::Int(7));
        assert_eq!(text, Key::Text("seven".into()));
    }
}
