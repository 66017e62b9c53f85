//! OutcomeStore — redb-backed persistence for mutation outcomes.
//!
//! The store keeps the last-known `OperationRecord` per cluster plus an
//! append-only history. Values are JSON-serialized into redb's `&[u8]`
//! columns. Both on-disk and in-memory backends are supported (the
//! latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Upper bound of the history key range for one cluster.
///
/// History keys are `{cluster_id}:{seq}`; `;` is the successor of `:` in
/// ASCII, so `{cluster_id}:` .. `{cluster_id};` spans exactly that prefix.
fn history_range(cluster_id: &str) -> (String, String) {
    (format!("{cluster_id}:"), format!("{cluster_id};"))
}

/// Thread-safe outcome store backed by redb.
#[derive(Clone)]
pub struct OutcomeStore {
    db: Arc<Database>,
}

impl OutcomeStore {
    /// Open (or create) a persistent outcome store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "outcome store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory outcome store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory outcome store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(OUTCOMES).map_err(map_err!(Table))?;
        txn.open_table(HISTORY).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Persist a record: replaces the latest outcome for the cluster and
    /// appends to its history, in one transaction.
    pub fn record(&self, record: &OperationRecord) -> StoreResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut outcomes = txn.open_table(OUTCOMES).map_err(map_err!(Table))?;
            outcomes
                .insert(record.cluster_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            let mut history = txn.open_table(HISTORY).map_err(map_err!(Table))?;
            let seq = {
                let (lo, hi) = history_range(&record.cluster_id);
                history
                    .range(lo.as_str()..hi.as_str())
                    .map_err(map_err!(Read))?
                    .count()
            };
            let key = format!("{}:{seq:010}", record.cluster_id);
            history
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            cluster_id = %record.cluster_id,
            success = record.outcome.success(),
            "outcome recorded"
        );
        Ok(())
    }

    /// Last-recorded outcome for a cluster, if any.
    pub fn last_outcome(&self, cluster_id: &str) -> StoreResult<Option<OperationRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OUTCOMES).map_err(map_err!(Table))?;
        match table.get(cluster_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: OperationRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Full history for a cluster, oldest first.
    pub fn history(&self, cluster_id: &str) -> StoreResult<Vec<OperationRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HISTORY).map_err(map_err!(Table))?;
        let (lo, hi) = history_range(cluster_id);
        let mut results = Vec::new();
        for entry in table
            .range(lo.as_str()..hi.as_str())
            .map_err(map_err!(Read))?
        {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: OperationRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Drop all records for a cluster. Returns true if a latest outcome existed.
    pub fn forget(&self, cluster_id: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut outcomes = txn.open_table(OUTCOMES).map_err(map_err!(Table))?;
            existed = outcomes
                .remove(cluster_id)
                .map_err(map_err!(Write))?
                .is_some();

            let mut history = txn.open_table(HISTORY).map_err(map_err!(Table))?;
            let keys: Vec<String> = {
                let (lo, hi) = history_range(cluster_id);
                history
                    .range(lo.as_str()..hi.as_str())
                    .map_err(map_err!(Read))?
                    .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                    .collect::<Result<_, _>>()
                    .map_err(map_err!(Read))?
            };
            for key in keys {
                history.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}
