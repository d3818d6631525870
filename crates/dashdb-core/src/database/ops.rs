//! Operation executors

use futures::future;
use futures::stream::{self, LocalBoxStream, StreamExt};
use rand::Rng;
use tracing::{debug, info};

use super::Database;
use crate::engine::{Cursor, Engine, Transaction, TxMode};
use crate::error::Result;
use crate::logging::prefix::DB;
use crate::outcome::{Context, Message, Outcome, Value};
use crate::record::{Key, Record};

/// Status token carried by the final `delete_all` outcome.
pub const DELETE_ALL_DONE: &str = "Done.";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const TEST_VALUE_LEN: usize = 26;

/// One report line for `record`, newline-terminated.
pub fn report_line(record: &Record) -> String {
    format!("Name for id {} is {}\n", record.key, record.value)
}

fn random_value(rng: &mut impl Rng) -> String {
    (0..TEST_VALUE_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

impl<E: Engine> Database<E> {
    /// Insert or overwrite `record`.
    pub async fn put(&self, record: Record) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }
        debug!("{} put {}", DB, record.key);

        let value = record.value.clone();
        self.run(TxMode::ReadWrite, |tx| async move { tx.put(&record).await })
            .await?;

        Ok(self.outcome(Value::Text(value), Message::Added, Some(TxMode::ReadWrite), None))
    }

    /// Upsert `count` synthetic records keyed `0..count` with random
    /// base-36 values, all in one transaction.
    pub async fn put_many(&self, count: u32) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }
        debug!("{} put_many {}", DB, count);

        let last = self
            .run(TxMode::ReadWrite, |tx| async move {
                let mut last = None;
                for i in 0..count {
                    let value = random_value(&mut rand::thread_rng());
                    tx.put(&Record::new(i64::from(i), value.clone())).await?;
                    last = Some(value);
                }
                Ok(last)
            })
            .await?;

        let value = last.map(Value::Text).unwrap_or(Value::Empty);
        Ok(self.outcome(
            value,
            Message::AddedTestData(count as usize),
            Some(TxMode::ReadWrite),
            None,
        ))
    }

    /// Look a record up by primary key.
    pub async fn get(&self, key: impl Into<Key>) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }
        let key = key.into();
        debug!("{} get {}", DB, key);

        let lookup = key.clone();
        let found = self
            .run(TxMode::ReadOnly, |tx| async move { tx.get(&lookup).await })
            .await?;

        Ok(match found {
            Some(record) => self.outcome(
                Value::Text(record.value),
                Message::Found,
                Some(TxMode::ReadOnly),
                None,
            ),
            None => self.outcome(
                Value::Key(key),
                Message::NotFound,
                Some(TxMode::ReadOnly),
                None,
            ),
        })
    }

    /// Look a record up through the secondary index.
    ///
    /// The index is not unique. When several records share `value`, which one
    /// answers is up to the engine; callers must not depend on it.
    pub async fn get_by_index(&self, value: impl Into<String>) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }
        let value = value.into();
        let index = self.config.schema.index.name.clone();
        debug!("{} get_by_index {}={}", DB, index, value);

        let lookup = value.clone();
        let index_name = index.clone();
        let found = self
            .run(TxMode::ReadOnly, |tx| async move {
                tx.get_by_index(&index_name, &lookup).await
            })
            .await?;

        Ok(match found {
            Some(record) => self.outcome(
                Value::Text(record.value),
                Message::FoundByIndex,
                Some(TxMode::ReadOnly),
                Some(&index),
            ),
            None => self.outcome(
                Value::Text(value),
                Message::NotFound,
                Some(TxMode::ReadOnly),
                Some(&index),
            ),
        })
    }

    /// Count records with a full cursor scan.
    pub async fn count(&self) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }

        let count = self
            .run(TxMode::ReadOnly, |tx| async move {
                let mut cursor = tx.open_cursor().await?;
                let mut count: usize = 0;
                while cursor.next().await?.is_some() {
                    count += 1;
                }
                Ok(count)
            })
            .await?;
        debug!("{} count {}", DB, count);

        Ok(self.outcome(
            Value::Count(count),
            Message::Total,
            Some(TxMode::ReadOnly),
            None,
        ))
    }

    /// Character length of the [`read_all`](Self::read_all) report.
    pub async fn size_report(&self) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }

        let report = self.build_report().await?;
        Ok(self.outcome(
            Value::Count(report.chars().count()),
            Message::Size,
            Some(TxMode::ReadOnly),
            None,
        ))
    }

    /// Every record as one report, one [`report_line`] per record in key order.
    pub async fn read_all(&self) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }

        let report = self.build_report().await?;
        Ok(self.outcome(
            Value::Text(report),
            Message::AllFound,
            Some(TxMode::ReadOnly),
            None,
        ))
    }

    async fn build_report(&self) -> Result<String> {
        self.run(TxMode::ReadOnly, |tx| async move {
            let mut cursor = tx.open_cursor().await?;
            let mut report = String::new();
            while let Some(record) = cursor.next().await? {
                report.push_str(&report_line(&record));
            }
            Ok(report)
        })
        .await
    }

    /// Delete by primary key. Deleting an absent key succeeds.
    pub async fn delete(&self, key: impl Into<Key>) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }
        let key = key.into();
        debug!("{} delete {}", DB, key);

        let target = key.clone();
        self.run(TxMode::ReadWrite, |tx| async move { tx.delete(&target).await })
            .await?;

        Ok(self.outcome(
            Value::Key(key),
            Message::Deleted,
            Some(TxMode::ReadWrite),
            None,
        ))
    }

    /// Delete every record.
    ///
    /// A read-write cursor scan collects the keys, then each key is removed
    /// by an independent [`delete`](Self::delete) with its own connection and
    /// transaction. The stream yields one "Deleted Data" outcome per record,
    /// in key order, followed by a final "All Data Removed" outcome: N+1
    /// items for N records. A failed per-key delete shows up as an `Err` item
    /// and the stream carries on.
    pub fn delete_all(&self) -> LocalBoxStream<'_, Result<Outcome>> {
        if let Some(outcome) = self.check_available() {
            return stream::once(future::ready(Ok(outcome))).boxed_local();
        }

        stream::once(self.scan_keys())
            .map(move |scanned| match scanned {
                Ok(keys) => {
                    debug!("{} delete_all fanning out {} deletes", DB, keys.len());
                    let done = self.outcome(
                        Value::Text(DELETE_ALL_DONE.to_string()),
                        Message::AllRemoved,
                        Some(TxMode::ReadWrite),
                        None,
                    );
                    stream::iter(keys)
                        .then(move |key| self.delete(key))
                        .chain(stream::once(future::ready(Ok(done))))
                        .boxed_local()
                }
                Err(err) => stream::once(future::ready(Err(err))).boxed_local(),
            })
            .flatten()
            .boxed_local()
    }

    async fn scan_keys(&self) -> Result<Vec<Key>> {
        self.run(TxMode::ReadWrite, |tx| async move {
            let mut cursor = tx.open_cursor().await?;
            let mut keys = Vec::new();
            while let Some(record) = cursor.next().await? {
                keys.push(record.key);
            }
            Ok(keys)
        })
        .await
    }

    /// Remove the database named `name` entirely.
    ///
    /// The outcome is produced only after the engine has finished deleting.
    pub async fn delete_database(&self, name: &str) -> Result<Outcome> {
        if let Some(outcome) = self.check_available() {
            return Ok(outcome);
        }

        self.engine
            .delete_database(name)
            .await
            .map_err(|e| self.report(e))?;
        info!("{} deleted database '{}'", DB, name);

        Ok(Outcome {
            value: Value::Text(name.to_string()),
            message: Message::DatabaseDeleted,
            context: Context {
                database: name.to_string(),
                ..self.context(None, None)
            },
        })
    }
}
