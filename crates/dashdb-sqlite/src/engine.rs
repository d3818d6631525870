//! SQLite storage engine implementing the dashdb engine contract

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use dashdb_core::schema::VALUE_FIELD;
use dashdb_core::{
    Connection, Cursor, DbError, Engine, Key, Opened, Record, Schema, Transaction, TxMode,
};
use rusqlite::{OptionalExtension, Row};
use tracing::{debug, warn};

use crate::convert::{key_from_sql, key_to_sql, quote_ident};
use crate::error::{Result, SqliteError};
use crate::schema::{table_exists, upgrade};

type CoreResult<T> = dashdb_core::Result<T>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// File extension of database files
pub const DB_FILE_EXTENSION: &str = "sqlite3";

/// SQLite-backed object store engine.
///
/// Each database name maps to one file in the engine's directory. Records
/// survive process restarts until deleted.
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    dir: PathBuf,
}

impl SqliteEngine {
    /// Create an engine over an existing directory.
    ///
    /// The capability check fails while the directory does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory if needed and return an engine over it.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the database files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing database `name`
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(DbError::Open(format!("invalid database name '{}'", name)).into());
        }
        Ok(self.dir.join(format!("{}.{}", name, DB_FILE_EXTENSION)))
    }

    fn open_file(&self, name: &str, version: u32, schema: &Schema) -> Result<Opened<SqliteConnection>> {
        if version == 0 {
            return Err(DbError::Open("version must be at least 1".into()).into());
        }

        let path = self.path_for(name)?;
        let conn = rusqlite::Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let created = upgrade(&conn, name, version, schema)?;
        debug!("opened '{}' at {}", name, path.display());

        Ok(Opened {
            connection: SqliteConnection {
                conn: Rc::new(conn),
                schema: Rc::new(schema.clone()),
            },
            created,
        })
    }

    fn remove_files(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Engine for SqliteEngine {
    type Conn = SqliteConnection;

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }

    async fn open(&self, name: &str, version: u32, schema: &Schema) -> CoreResult<Opened<Self::Conn>> {
        Ok(self.open_file(name, version, schema)?)
    }

    async fn delete_database(&self, name: &str) -> CoreResult<()> {
        Ok(self.remove_files(name)?)
    }
}

/// One open SQLite connection.
pub struct SqliteConnection {
    conn: Rc<rusqlite::Connection>,
    schema: Rc<Schema>,
}

impl Connection for SqliteConnection {
    type Tx = SqliteTransaction;

    fn transaction(&self, store: &str, mode: TxMode) -> CoreResult<Self::Tx> {
        if !table_exists(&self.conn, store)? {
            return Err(DbError::Transaction(format!("no object store named '{}'", store)));
        }

        let begin = match mode {
            TxMode::ReadOnly => "BEGIN DEFERRED",
            TxMode::ReadWrite => "BEGIN IMMEDIATE",
        };
        self.conn
            .execute_batch(begin)
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        Ok(SqliteTransaction {
            inner: Rc::new(TxInner {
                conn: self.conn.clone(),
                store: store.to_string(),
                table: quote_ident(store),
                key_column: quote_ident(&self.schema.key_path),
                value_column: quote_ident(VALUE_FIELD),
                index: self.schema.index.name.clone(),
                mode,
                finished: Cell::new(false),
            }),
        })
    }

    fn close(self) {
        // Dropping the last handle closes the file
        drop(self.conn);
    }
}

/// Transaction over one table, bracketed by BEGIN and COMMIT/ROLLBACK.
#[derive(Clone)]
pub struct SqliteTransaction {
    inner: Rc<TxInner>,
}

struct TxInner {
    conn: Rc<rusqlite::Connection>,
    store: String,
    table: String,
    key_column: String,
    value_column: String,
    index: String,
    mode: TxMode,
    finished: Cell<bool>,
}

impl SqliteTransaction {
    fn active(&self) -> CoreResult<&rusqlite::Connection> {
        if self.inner.finished.get() {
            return Err(DbError::Transaction(format!(
                "transaction on '{}' has already finished",
                self.inner.store
            )));
        }
        Ok(self.inner.conn.as_ref())
    }

    fn writable(&self) -> CoreResult<&rusqlite::Connection> {
        if !self.inner.mode.is_writable() {
            return Err(DbError::ReadOnly(self.inner.store.clone()));
        }
        self.active()
    }

    fn select_columns(&self) -> String {
        format!(
            "SELECT {}, {} FROM {}",
            self.inner.key_column, self.inner.value_column, self.inner.table
        )
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(rusqlite::types::Value, String)> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn query_record(&self, sql: &str, param: rusqlite::types::Value) -> Result<Option<Record>> {
        let row = self
            .active()?
            .query_row(sql, [param], Self::row_to_record)
            .optional()?;
        row.map(|(key, value)| Ok(Record { key: key_from_sql(key)?, value }))
            .transpose()
    }

    fn finish(&self, sql: &str) -> CoreResult<()> {
        if self.inner.finished.replace(true) {
            return Err(DbError::Transaction(format!(
                "transaction on '{}' has already finished",
                self.inner.store
            )));
        }
        self.inner
            .conn
            .execute_batch(sql)
            .map_err(|e| DbError::Transaction(e.to_string()))
    }
}

#[async_trait(?Send)]
impl Transaction for SqliteTransaction {
    type Cursor = SqliteCursor;

    fn mode(&self) -> TxMode {
        self.inner.mode
    }

    async fn put(&self, record: &Record) -> CoreResult<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}, {}) VALUES (?1, ?2)",
            self.inner.table, self.inner.key_column, self.inner.value_column
        );
        self.writable()?
            .execute(&sql, rusqlite::params![key_to_sql(&record.key), record.value])
            .map_err(SqliteError::from)?;
        Ok(())
    }

    async fn get(&self, key: &Key) -> CoreResult<Option<Record>> {
        let sql = format!("{} WHERE {} = ?1", self.select_columns(), self.inner.key_column);
        Ok(self.query_record(&sql, key_to_sql(key))?)
    }

    async fn get_by_index(&self, index: &str, value: &str) -> CoreResult<Option<Record>> {
        if index != self.inner.index {
            return Err(DbError::Request(format!("no index named '{}'", index)));
        }
        let sql = format!(
            "{} WHERE {} = ?1 ORDER BY {} LIMIT 1",
            self.select_columns(),
            self.inner.value_column,
            self.inner.key_column
        );
        Ok(self.query_record(&sql, rusqlite::types::Value::Text(value.to_string()))?)
    }

    async fn delete(&self, key: &Key) -> CoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            self.inner.table, self.inner.key_column
        );
        self.writable()?
            .execute(&sql, [key_to_sql(key)])
            .map_err(SqliteError::from)?;
        Ok(())
    }

    async fn open_cursor(&self) -> CoreResult<Self::Cursor> {
        self.active()?;
        Ok(SqliteCursor {
            tx: self.clone(),
            last: None,
        })
    }

    async fn complete(&self) -> CoreResult<()> {
        self.finish("COMMIT")
    }

    fn abort(&self) {
        if self.inner.finished.get() {
            return;
        }
        if let Err(e) = self.finish("ROLLBACK") {
            warn!("rollback on '{}' failed: {}", self.inner.store, e);
        }
    }
}

/// Keyset cursor: each step selects the first key greater than the last one.
pub struct SqliteCursor {
    tx: SqliteTransaction,
    last: Option<Key>,
}

#[async_trait(?Send)]
impl Cursor for SqliteCursor {
    async fn next(&mut self) -> CoreResult<Option<Record>> {
        let inner = &self.tx.inner;
        let next = match &self.last {
            None => {
                let sql = format!(
                    "{} ORDER BY {} LIMIT 1",
                    self.tx.select_columns(),
                    inner.key_column
                );
                let row = self
                    .tx
                    .active()?
                    .query_row(&sql, [], SqliteTransaction::row_to_record)
                    .optional()
                    .map_err(SqliteError::from)?;
                row.map(|(key, value)| Ok::<_, SqliteError>(Record { key: key_from_sql(key)?, value }))
                    .transpose()?
            }
            Some(last) => {
                let sql = format!(
                    "{} WHERE {} > ?1 ORDER BY {} LIMIT 1",
                    self.tx.select_columns(),
                    inner.key_column,
                    inner.key_column
                );
                self.tx.query_record(&sql, key_to_sql(last))?
            }
        };

        if let Some(record) = &next {
            self.last = Some(record.key.clone());
        }
        Ok(next)
    }
}
