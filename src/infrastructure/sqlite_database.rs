use async_trait::async_trait;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{
    storage_error, Collection, DatabaseTransaction, Document, DocumentQuery, DocumentStore,
};

const SELECT_COLUMNS: &str =
    "SELECT collection, id, owner_id, lookup_key, time_created, time_updated, version, data FROM documents";

/// How long a writer waits for the write lock before giving up with a conflict
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of the document store (file backed or in-memory)
pub struct SqliteDatabase {
    pool: SqlitePool,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_collection(raw: &str) -> AppResult<Collection> {
    match raw {
        "users" => Ok(Collection::Users),
        "posts" => Ok(Collection::Posts),
        "events" => Ok(Collection::Events),
        "projects" => Ok(Collection::Projects),
        other => Err(AppError::DatabaseError(format!(
            "Unknown collection '{}' in documents table",
            other
        ))),
    }
}

fn row_to_document(row: SqliteRow) -> AppResult<Document> {
    let collection: String = row.try_get("collection")?;
    Ok(Document {
        collection: parse_collection(&collection)?,
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        lookup_key: row.try_get("lookup_key")?,
        created_time: row.try_get("time_created")?,
        updated_time: row.try_get("time_updated")?,
        version: row.try_get::<i64, _>("version")? as u64,
        data: row.try_get("data")?,
    })
}

/// Listing query. Newest first, ties by id descending.
fn list_query(query: &DocumentQuery) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    qb.push(" WHERE collection = ");
    qb.push_bind(query.collection.as_str());

    if let Some(owner_id) = query.owner_id {
        qb.push(" AND owner_id = ");
        qb.push_bind(owner_id);
    }

    qb.push(" ORDER BY time_created DESC, id DESC");
    qb
}

fn map_write_error(err: sqlx::Error, collection: Collection, doc: &Document) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => match &doc.lookup_key {
            Some(key) => AppError::Conflict(format!(
                "{} entry '{}' already exists",
                collection, key
            )),
            None => AppError::Conflict(format!("{} document {} already exists", collection, doc.id)),
        },
        _ => storage_error(
            err,
            format!("Failed to write {} document {}", collection, doc.id),
        ),
    }
}

impl SqliteDatabase {
    /// Connect to `url` (e.g. `sqlite:data/campus_graph.db` or `sqlite::memory:`)
    /// and create the schema if needed.
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::DatabaseError(format!("Invalid database url {}: {}", url, e)))?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        // An in-memory database lives and dies with its connection, so pin it to one.
        let in_memory = url.contains(":memory:");
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };
        if !in_memory {
            // Readers keep going while a writer holds the lock
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create the documents table, its indexes and the write lock row
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                owner_id INTEGER,
                lookup_key TEXT,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                data BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_lookup ON documents(collection, lookup_key)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create lookup index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, owner_id, time_created DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create owner index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(collection, time_created DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create created index: {}", e)))?;

        // Single row bumped as the first statement of every transaction
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS write_lock (id INTEGER PRIMARY KEY CHECK (id = 1), generation INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create write lock table: {}", e)))?;

        sqlx::query("INSERT OR IGNORE INTO write_lock (id, generation) VALUES (1, 0)")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(e, "Failed to seed write lock"))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDatabase {
    /// Opens a transaction that already holds the write lock, like
    /// `BEGIN IMMEDIATE`. Contending transactions wait up to `BUSY_TIMEOUT`
    /// here instead of failing a lock upgrade after their first read.
    async fn begin_transaction(&self) -> AppResult<DatabaseTransaction> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error(e, "Failed to begin transaction"))?;

        sqlx::query("UPDATE write_lock SET generation = generation + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(e, "Failed to acquire write lock"))?;

        Ok(DatabaseTransaction::new(tx))
    }

    async fn get_document(&self, collection: Collection, id: i64) -> AppResult<Option<Document>> {
        let row = sqlx::query(&format!("{} WHERE collection = ? AND id = ?", SELECT_COLUMNS))
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                storage_error(e, format!("Failed to get {} document {}", collection, id))
            })?;

        row.map(row_to_document).transpose()
    }

    async fn find_by_lookup_key(
        &self,
        collection: Collection,
        key: &str,
    ) -> AppResult<Option<Document>> {
        let row = sqlx::query(&format!(
            "{} WHERE collection = ? AND lookup_key = ?",
            SELECT_COLUMNS
        ))
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, format!("Failed to look up {} '{}'", collection, key)))?;

        row.map(row_to_document).transpose()
    }

    async fn list_documents(&self, query: DocumentQuery) -> AppResult<Vec<Document>> {
        let rows = list_query(&query)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, format!("Failed to list {}", query.collection)))?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn insert_document(&self, doc: &Document) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO documents (collection, id, owner_id, lookup_key, time_created, time_updated, version, data) VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(doc.collection.as_str())
        .bind(doc.id)
        .bind(doc.owner_id)
        .bind(doc.lookup_key.as_deref())
        .bind(doc.created_time)
        .bind(doc.created_time)
        .bind(&doc.data)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, doc.collection, doc))?;
        Ok(())
    }

    async fn get_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        collection: Collection,
        id: i64,
    ) -> AppResult<Option<Document>> {
        let conn = tx.inner_mut();
        let row = sqlx::query(&format!("{} WHERE collection = ? AND id = ?", SELECT_COLUMNS))
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&mut **conn)
            .await
            .map_err(|e| {
                storage_error(
                    e,
                    format!("Failed to get {} document {} in transaction", collection, id),
                )
            })?;

        row.map(row_to_document).transpose()
    }

    async fn list_documents_tx(
        &self,
        tx: &mut DatabaseTransaction,
        query: DocumentQuery,
    ) -> AppResult<Vec<Document>> {
        let conn = tx.inner_mut();
        let rows = list_query(&query)
            .build()
            .fetch_all(&mut **conn)
            .await
            .map_err(|e| {
                storage_error(e, format!("Failed to list {} in transaction", query.collection))
            })?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn update_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        doc: &Document,
    ) -> AppResult<u64> {
        let conn = tx.inner_mut();
        let result = sqlx::query(
            "UPDATE documents SET owner_id = ?, lookup_key = ?, time_updated = ?, version = version + 1, data = ? WHERE collection = ? AND id = ? AND version = ?",
        )
        .bind(doc.owner_id)
        .bind(doc.lookup_key.as_deref())
        .bind(now_millis())
        .bind(&doc.data)
        .bind(doc.collection.as_str())
        .bind(doc.id)
        .bind(doc.version as i64)
        .execute(&mut **conn)
        .await
        .map_err(|e| map_write_error(e, doc.collection, doc))?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM documents WHERE collection = ? AND id = ?")
                .bind(doc.collection.as_str())
                .bind(doc.id)
                .fetch_optional(&mut **conn)
                .await
                .map_err(|e| storage_error(e, "Failed to check document version"))?
                .is_some();
            return Err(if exists {
                AppError::Conflict(format!(
                    "{} document {} was modified concurrently",
                    doc.collection, doc.id
                ))
            } else {
                AppError::NotFound(format!("{} document {} not found", doc.collection, doc.id))
            });
        }

        Ok(doc.version + 1)
    }

    async fn delete_document_tx(
        &self,
        tx: &mut DatabaseTransaction,
        collection: Collection,
        id: i64,
    ) -> AppResult<bool> {
        let conn = tx.inner_mut();
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut **conn)
            .await
            .map_err(|e| {
                storage_error(
                    e,
                    format!("Failed to delete {} document {} in transaction", collection, id),
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}
