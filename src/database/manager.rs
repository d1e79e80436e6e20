// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Connection lifecycle manager.
//!
//! Owns the single shared connection. Readers clone the current handle out of
//! the slot; `reconnect` holds the slot's write lock for its whole duration so
//! no request can observe a half-replaced handle.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

use super::{Connection, ConnectionError, Connector, PersistenceError, PersistenceResult};

/// Published connection state, observed by health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Owner of the process-wide persistence connection.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    slot: RwLock<Option<Arc<C::Connection>>>,
    status: watch::Sender<ConnectionStatus>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Open the initial connection.
    pub async fn connect(connector: C) -> PersistenceResult<Self> {
        let connection = connector.open().await?;
        info!("Database connection opened");
        let (status, _) = watch::channel(ConnectionStatus::Connected);
        Ok(Self {
            connector,
            slot: RwLock::new(Some(Arc::new(connection))),
            status,
        })
    }

    /// Borrow the current connection.
    ///
    /// # Errors
    /// Returns `PersistenceError::Disconnected` after `disconnect` or a failed
    /// `reconnect`.
    pub async fn connection(&self) -> PersistenceResult<Arc<C::Connection>> {
        self.slot
            .read()
            .await
            .clone()
            .ok_or(PersistenceError::Disconnected)
    }

    /// Subscribe to connection status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Probe the current connection. Never fails; problems are logged.
    pub async fn test_connection(&self) -> bool {
        let connection = match self.connection().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, "Database connection test failed");
                return false;
            }
        };

        match connection.probe().await {
            Ok(()) => {
                info!("Database connection test succeeded");
                true
            }
            Err(e) => {
                error!(error = %e, "Database connection test failed");
                false
            }
        }
    }

    /// Close the current connection. Calling it while disconnected is a no-op.
    pub async fn disconnect(&self) {
        let mut slot = self.slot.write().await;
        Self::close_slot(&mut slot).await;
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    /// Replace the connection with a freshly opened and probed one.
    ///
    /// On failure the manager stays disconnected.
    pub async fn reconnect(&self) -> Result<(), ConnectionError> {
        let mut slot = self.slot.write().await;
        Self::close_slot(&mut slot).await;
        self.status.send_replace(ConnectionStatus::Disconnected);

        let connection = self.connector.open().await.map_err(|e| {
            error!(error = %e, "Database reconnect failed to open connection");
            ConnectionError::ReconnectFailed(e)
        })?;

        if let Err(e) = connection.probe().await {
            error!(error = %e, "Database reconnect failed probe");
            if let Err(close_err) = connection.close().await {
                warn!(error = %close_err, "Failed to close rejected connection");
            }
            return Err(ConnectionError::ReconnectFailed(e));
        }

        *slot = Some(Arc::new(connection));
        self.status.send_replace(ConnectionStatus::Connected);
        info!("Database reconnected");
        Ok(())
    }

    async fn close_slot(slot: &mut Option<Arc<C::Connection>>) {
        if let Some(connection) = slot.take() {
            match connection.close().await {
                Ok(()) => info!("Database disconnected"),
                Err(e) => error!(error = %e, "Error while disconnecting database"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory connector whose failures are toggled from tests.
    #[derive(Clone, Default)]
    struct FakeConnector {
        fail_open: Arc<AtomicBool>,
        fail_probe: Arc<AtomicBool>,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    struct FakeConnection {
        fail_probe: Arc<AtomicBool>,
        closed: Arc<AtomicUsize>,
        is_closed: AtomicBool,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Connection = FakeConnection;

        async fn open(&self) -> PersistenceResult<FakeConnection> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(PersistenceError::Backend("connection refused".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeConnection {
                fail_probe: self.fail_probe.clone(),
                closed: self.closed.clone(),
                is_closed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        async fn probe(&self) -> PersistenceResult<()> {
            if self.is_closed.load(Ordering::SeqCst) {
                return Err(PersistenceError::Disconnected);
            }
            if self.fail_probe.load(Ordering::SeqCst) {
                return Err(PersistenceError::Backend("probe timed out".into()));
            }
            Ok(())
        }

        async fn close(&self) -> PersistenceResult<()> {
            self.is_closed.store(true, Ordering::SeqCst);
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connection_reports_probe_result() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();
        assert!(manager.test_connection().await);

        connector.fail_probe.store(true, Ordering::SeqCst);
        assert!(!manager.test_connection().await);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();

        manager.disconnect().await;
        manager.disconnect().await;

        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert!(!manager.test_connection().await);
        assert!(matches!(
            manager.connection().await,
            Err(PersistenceError::Disconnected)
        ));
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_after_disconnect_restores_connection() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();
        let mut status = manager.subscribe();

        manager.disconnect().await;
        manager.reconnect().await.unwrap();

        assert!(manager.test_connection().await);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn reconnect_closes_previous_connection() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();
        let old = manager.connection().await.unwrap();

        manager.reconnect().await.unwrap();

        assert!(old.probe().await.is_err());
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert!(manager.test_connection().await);
    }

    #[tokio::test]
    async fn reconnect_open_failure_leaves_manager_disconnected() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();
        connector.fail_open.store(true, Ordering::SeqCst);

        let result = manager.reconnect().await;

        assert!(matches!(result, Err(ConnectionError::ReconnectFailed(_))));
        assert!(!manager.test_connection().await);
        assert!(manager.connection().await.is_err());
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_probe_failure_discards_new_connection() {
        let connector = FakeConnector::default();
        let manager = ConnectionManager::connect(connector.clone()).await.unwrap();
        connector.fail_probe.store(true, Ordering::SeqCst);

        let result = manager.reconnect().await;

        assert!(matches!(result, Err(ConnectionError::ReconnectFailed(_))));
        assert!(manager.connection().await.is_err());
        // old connection and rejected fresh one
        assert_eq!(connector.closed.load(Ordering::SeqCst), 2);

        connector.fail_probe.store(false, Ordering::SeqCst);
        manager.reconnect().await.unwrap();
        assert!(manager.test_connection().await);
    }
}
