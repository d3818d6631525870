//! Database configuration

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::Schema;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "dashDb";

/// Schema version the store and index are declared at.
pub const SCHEMA_VERSION: u32 = 1;

/// Name, version and schema of the database a [`crate::Database`] talks to.
///
/// Every field has a default, so partial JSON documents are accepted:
///
/// ```rust
/// use dashdb_core::DatabaseConfig;
///
/// let config = DatabaseConfig::from_json(r#"{"name": "inventory"}"#).unwrap();
/// assert_eq!(config.name, "inventory");
/// assert_eq!(config.schema.store, "dashStore");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub name: String,
    pub version: u32,
    pub schema: Schema,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DB_NAME.to_string(),
            version: SCHEMA_VERSION,
            schema: Schema::default(),
        }
    }
}

impl DatabaseConfig {
    /// Default configuration under a different database name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
