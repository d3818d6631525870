//! Store schema and the one-time initialization hook
//!
//! A database holds a single object store keyed by `key_path`, with one
//! non-unique secondary index over the record `value` field. Engines call
//! [`Schema::install`] from their upgrade path (first open, or an open at a
//! newer version) and never otherwise create stores.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// Default object store name.
pub const DEFAULT_STORE: &str = "dashStore";

/// Default primary key path.
pub const DEFAULT_KEY_PATH: &str = "dashId";

/// Default secondary index name.
pub const DEFAULT_INDEX: &str = "value";

/// The record field every secondary index covers.
pub const VALUE_FIELD: &str = "value";

/// Secondary index declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSpec {
    pub name: String,
    pub key_path: String,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_INDEX.to_string(),
            key_path: VALUE_FIELD.to_string(),
        }
    }
}

/// One store, one key path, one non-unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub store: String,
    pub key_path: String,
    pub index: IndexSpec,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            store: DEFAULT_STORE.to_string(),
            key_path: DEFAULT_KEY_PATH.to_string(),
            index: IndexSpec::default(),
        }
    }
}

/// Store/index creation primitives an engine exposes during upgrade.
pub trait SchemaBuilder {
    /// Whether a store with this name already exists.
    fn has_store(&self, name: &str) -> Result<bool>;

    /// Create a store whose records are keyed by `key_path`.
    fn create_store(&mut self, name: &str, key_path: &str) -> Result<()>;

    /// Create an index named `name` over `key_path` on an existing store.
    fn create_index(&mut self, store: &str, name: &str, key_path: &str, unique: bool)
        -> Result<()>;
}

impl Schema {
    /// Check the schema can be expressed over `{ key, value }` records.
    pub fn validate(&self) -> Result<()> {
        if self.store.is_empty() {
            return Err(DbError::Upgrade("store name is empty".into()));
        }
        if self.key_path.is_empty() {
            return Err(DbError::Upgrade("key path is empty".into()));
        }
        if self.index.name.is_empty() {
            return Err(DbError::Upgrade("index name is empty".into()));
        }
        if self.index.key_path != VALUE_FIELD {
            return Err(DbError::Upgrade(format!(
                "index '{}' must cover '{}', not '{}'",
                self.index.name, VALUE_FIELD, self.index.key_path
            )));
        }
        if self.key_path == VALUE_FIELD {
            return Err(DbError::Upgrade(format!(
                "key path cannot be the indexed field '{}'",
                VALUE_FIELD
            )));
        }
        Ok(())
    }

    /// Create the store and its index unless the store already exists.
    ///
    /// Returns `true` when the store was created by this call.
    pub fn install(&self, builder: &mut dyn SchemaBuilder) -> Result<bool> {
        self.validate()?;

        if builder.has_store(&self.store)? {
            return Ok(false);
        }

        builder.create_store(&self.store, &self.key_path)?;
        builder.create_index(&self.store, &self.index.name, &self.index.key_path, false)?;
        Ok(true)
    }
}
