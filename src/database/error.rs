// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence errors and the storage-agnostic failure classification.

// =============================================================================
// Failure Kind
// =============================================================================

/// Storage-agnostic classification of a persistence failure.
///
/// Storage adapters translate engine errors into [`PersistenceError`] and the
/// error normalizer only ever looks at this kind, never at engine codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceFailureKind {
    /// A uniqueness constraint rejected the write.
    UniqueViolation,
    /// The addressed record does not exist.
    RecordNotFound,
    /// No usable connection.
    Unavailable,
    /// Anything else.
    Other,
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database is disconnected")]
    Disconnected,

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    pub fn kind(&self) -> PersistenceFailureKind {
        match self {
            PersistenceError::UniqueViolation(_) => PersistenceFailureKind::UniqueViolation,
            PersistenceError::NotFound(_) => PersistenceFailureKind::RecordNotFound,
            PersistenceError::Disconnected | PersistenceError::RedbDatabase(_) => {
                PersistenceFailureKind::Unavailable
            }
            PersistenceError::RedbTransaction(_)
            | PersistenceError::RedbTable(_)
            | PersistenceError::RedbStorage(_)
            | PersistenceError::RedbCommit(_)
            | PersistenceError::Backend(_) => PersistenceFailureKind::Other,
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Lifecycle errors surfaced by [`super::ConnectionManager`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// A fresh connection could not be opened or failed its first probe.
    #[error("database reconnect failed: {0}")]
    ReconnectFailed(#[source] PersistenceError),
}
