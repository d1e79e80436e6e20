// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shared Database Connection
//!
//! The process owns exactly one persistence connection. It is opened before
//! the server accepts requests, probed on demand, swapped wholesale on
//! reconnect and closed once during teardown.
//!
//! ## Layout
//!
//! - [`Connector`] / [`Connection`] - the storage seam (open, probe, close)
//! - [`ConnectionManager`] - lifecycle owner; everything else borrows through it
//! - [`RedbConnector`] - embedded redb adapter used by the binary

pub mod embedded;
pub mod error;
pub mod manager;

use async_trait::async_trait;

pub use self::embedded::{RedbConnection, RedbConnector};
pub use self::error::{ConnectionError, PersistenceError, PersistenceFailureKind, PersistenceResult};
pub use self::manager::{ConnectionManager, ConnectionStatus};

/// The connection manager used by the server.
pub type Database = ConnectionManager<RedbConnector>;

/// Opens connections to a storage backend.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    /// Open a fresh, fully constructed connection.
    async fn open(&self) -> PersistenceResult<Self::Connection>;
}

/// A live connection to a storage backend.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Trivial round-trip proving the connection is usable.
    async fn probe(&self) -> PersistenceResult<()>;

    /// Release the underlying resources.
    async fn close(&self) -> PersistenceResult<()>;
}
