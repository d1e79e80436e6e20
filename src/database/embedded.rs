// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database adapter backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `gate_health`: probe table, pre-created on open so read transactions
//!   can always open it

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, TableDefinition};
use tokio::sync::OnceCell;

use super::{Connection, ConnectionManager, Connector, PersistenceError, PersistenceResult};

/// Probe table: name → unused counter.
const HEALTH: TableDefinition<&str, u64> = TableDefinition::new("gate_health");

static SHARED: OnceCell<Arc<ConnectionManager<RedbConnector>>> = OnceCell::const_new();

/// Opens redb database files.
#[derive(Debug, Clone)]
pub struct RedbConnector {
    path: PathBuf,
}

impl RedbConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An open redb database. Closing drops the database and releases the file.
pub struct RedbConnection {
    db: Mutex<Option<Database>>,
}

impl RedbConnection {
    fn open(path: &Path) -> PersistenceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(HEALTH)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Mutex::new(Some(db)),
        })
    }

    /// Run `f` against the open database.
    ///
    /// # Errors
    /// Returns `PersistenceError::Disconnected` once the connection is closed.
    pub fn with_database<T>(
        &self,
        f: impl FnOnce(&Database) -> PersistenceResult<T>,
    ) -> PersistenceResult<T> {
        let guard = self
            .db
            .lock()
            .map_err(|_| PersistenceError::Backend("database mutex poisoned".into()))?;
        match guard.as_ref() {
            Some(db) => f(db),
            None => Err(PersistenceError::Disconnected),
        }
    }
}

#[async_trait]
impl Connector for RedbConnector {
    type Connection = RedbConnection;

    async fn open(&self) -> PersistenceResult<RedbConnection> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || RedbConnection::open(&path))
            .await
            .map_err(|e| PersistenceError::Backend(format!("open task failed: {e}")))?
    }
}

#[async_trait]
impl Connection for RedbConnection {
    async fn probe(&self) -> PersistenceResult<()> {
        self.with_database(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(HEALTH)?;
            Ok(())
        })
    }

    async fn close(&self) -> PersistenceResult<()> {
        let mut guard = self
            .db
            .lock()
            .map_err(|_| PersistenceError::Backend("database mutex poisoned".into()))?;
        drop(guard.take());
        Ok(())
    }
}

impl ConnectionManager<RedbConnector> {
    /// Process-wide database manager.
    ///
    /// The first call opens the connection; later calls return the same
    /// instance and ignore their connector.
    pub async fn shared(connector: RedbConnector) -> PersistenceResult<Arc<Self>> {
        SHARED
            .get_or_try_init(move || async move { Self::connect(connector).await.map(Arc::new) })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use tempfile::TempDir;

    fn connector(dir: &TempDir) -> RedbConnector {
        RedbConnector::new(dir.path().join("nested").join("gate.redb"))
    }

    #[tokio::test]
    async fn open_creates_file_and_probes() {
        let dir = TempDir::new().unwrap();
        let connector = connector(&dir);

        let connection = connector.open().await.unwrap();
        assert!(connector.path().exists());
        connection.probe().await.unwrap();
    }

    #[tokio::test]
    async fn probe_after_close_reports_disconnected() {
        let dir = TempDir::new().unwrap();
        let connection = connector(&dir).open().await.unwrap();

        connection.close().await.unwrap();
        connection.close().await.unwrap();

        assert!(matches!(
            connection.probe().await,
            Err(PersistenceError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn manager_reconnects_to_same_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConnectionManager::connect(connector(&dir)).await.unwrap();
        assert!(manager.test_connection().await);

        manager.disconnect().await;
        assert!(!manager.test_connection().await);

        manager.reconnect().await.unwrap();
        assert!(manager.test_connection().await);
    }

    #[tokio::test]
    async fn shared_returns_the_existing_instance() {
        let dir = TempDir::new().unwrap();
        let first = Database::shared(connector(&dir)).await.unwrap();
        let second = Database::shared(RedbConnector::new(dir.path().join("other.redb")))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!dir.path().join("other.redb").exists());
    }
}
