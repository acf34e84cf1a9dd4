// Database Interface - Persistent document store for users and content
// Each document is one JSON blob keyed by (collection, id), with a few
// denormalized columns (owner, lookup key, creation time) for queries.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use std::fmt;

/// Collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Posts,
    Events,
    Projects,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
            Collection::Events => "events",
            Collection::Projects => "projects",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document with its bookkeeping columns
#[derive(Debug, Clone)]
pub struct Document {
    pub collection: Collection,
    pub id: i64,
    pub owner_id: Option<i64>,
    pub lookup_key: Option<String>,
    pub created_time: i64,
    pub updated_time: i64,
    pub version: u64,
    pub data: Vec<u8>,
}

/// Listing query. Results are ordered newest first, ties by id descending.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: Collection,
    pub owner_id: Option<i64>,
}

impl DocumentQuery {
    pub fn all(collection: Collection) -> Self {
        Self {
            collection,
            owner_id: None,
        }
    }

    pub fn owned_by(collection: Collection, owner_id: i64) -> Self {
        Self {
            collection,
            owner_id: Some(owner_id),
        }
    }
}

/// Transaction wrapper for database operations
pub struct DatabaseTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl DatabaseTransaction {
    pub fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Transaction<'static, Sqlite> {
        &mut self.tx
    }

    /// Commit the transaction. Dropping it instead rolls back.
    pub async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| storage_error(e, "Failed to commit transaction"))
    }
}

/// SQLITE_BUSY / SQLITE_LOCKED, including their extended codes
fn is_lock_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map_or(false, |code| matches!(code & 0xff, 5 | 6)),
        _ => false,
    }
}

/// Driver error to `AppError`. Lock contention that outlived the busy timeout
/// is a retryable conflict, not a storage failure.
pub(crate) fn storage_error(err: sqlx::Error, context: impl fmt::Display) -> AppError {
    if is_lock_contention(&err) {
        AppError::Conflict(format!("{}: the store is busy, retry the request", context))
    } else {
        AppError::DatabaseError(format!("{}: {}", context, err))
    }
}

/// Persistent store interface. Reads outside a transaction go straight to the
/// pool; every read-modify-write goes through a `DatabaseTransaction`, which
/// holds the write lock from `begin_transaction` until commit or drop.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn begin_transaction(&self) -> AppResult<DatabaseTransaction>;

    async fn get_document(&self, collection: Collection, id: i64) -> AppResult<Option<Document>>;
    async fn find_by_lookup_key(
        &self,
        collection: Collection,
        key: &str,
    ) -> AppResult<Option<Document>>;
    async fn list_documents(&self, query: DocumentQuery) -> AppResult<Vec<Document>>;
    async fn insert_document(&self, doc: &Document) -> AppResult<()>;

    // Transactional operations - Execute within existing transaction
    async fn get_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        collection: Collection,
        id: i64,
    ) -> AppResult<Option<Document>>;

    async fn list_documents_tx(
        &self,
        tx: &mut DatabaseTransaction,
        query: DocumentQuery,
    ) -> AppResult<Vec<Document>>;

    /// Replace the document body if its version still matches `doc.version`.
    /// Returns the new version.
    async fn update_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        doc: &Document,
    ) -> AppResult<u64>;

    async fn delete_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        collection: Collection,
        id: i64,
    ) -> AppResult<bool>;

    async fn health_check(&self) -> AppResult<()>;
}
