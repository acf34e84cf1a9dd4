// Entity Store - typed access to the document store
// Entities are serialized to JSON; the store only sees opaque documents plus the
// columns an entity chooses to expose (owner, lookup key, creation time).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{
    Collection, DatabaseTransaction, Document, DocumentQuery, DocumentStore,
};

/// Implemented by every persisted model
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn entity_id(&self) -> i64;

    /// Creation time in milliseconds since epoch, used for ordering
    fn created_time(&self) -> i64;

    fn owner_id(&self) -> Option<i64> {
        None
    }

    /// Unique secondary key (e.g. username)
    fn lookup_key(&self) -> Option<String> {
        None
    }
}

fn decode<T: Entity>(doc: &Document) -> AppResult<T> {
    serde_json::from_slice(&doc.data).map_err(|e| {
        AppError::SerializationError(format!(
            "Failed to decode {} document {}: {}",
            doc.collection, doc.id, e
        ))
    })
}

fn encode<T: Entity>(entity: &T, version: u64) -> AppResult<Document> {
    let created_time = entity.created_time();
    Ok(Document {
        collection: T::COLLECTION,
        id: entity.entity_id(),
        owner_id: entity.owner_id(),
        lookup_key: entity.lookup_key(),
        created_time,
        updated_time: created_time,
        version,
        data: serde_json::to_vec(entity)?,
    })
}

fn not_found<T: Entity>(id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", T::COLLECTION, id))
}

#[derive(Clone)]
pub struct EntityStore {
    db: Arc<dyn DocumentStore>,
}

impl EntityStore {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<dyn DocumentStore> {
        &self.db
    }

    pub async fn get<T: Entity>(&self, id: i64) -> AppResult<Option<T>> {
        match self.db.get_document(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(&doc)?)),
            None => Ok(None),
        }
    }

    pub async fn require<T: Entity>(&self, id: i64) -> AppResult<T> {
        self.get(id).await?.ok_or_else(|| not_found::<T>(id))
    }

    pub async fn find_by_key<T: Entity>(&self, key: &str) -> AppResult<Option<T>> {
        match self.db.find_by_lookup_key(T::COLLECTION, key).await? {
            Some(doc) => Ok(Some(decode(&doc)?)),
            None => Ok(None),
        }
    }

    /// All entities of a collection, newest first
    pub async fn list<T: Entity>(&self) -> AppResult<Vec<T>> {
        self.query(DocumentQuery::all(T::COLLECTION)).await
    }

    /// Entities owned by `owner_id`, newest first
    pub async fn list_owned_by<T: Entity>(&self, owner_id: i64) -> AppResult<Vec<T>> {
        self.query(DocumentQuery::owned_by(T::COLLECTION, owner_id))
            .await
    }

    async fn query<T: Entity>(&self, query: DocumentQuery) -> AppResult<Vec<T>> {
        self.db
            .list_documents(query)
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    pub async fn insert<T: Entity>(&self, entity: &T) -> AppResult<()> {
        self.db.insert_document(&encode(entity, 1)?).await
    }

    pub async fn begin(&self) -> AppResult<EntityTransaction> {
        let tx = self.db.begin_transaction().await?;
        Ok(EntityTransaction {
            db: self.db.clone(),
            tx,
            versions: HashMap::new(),
        })
    }
}

/// Read-modify-write unit. Entities must be read through the transaction before
/// they are saved; the version seen at read time guards the write. Dropping the
/// transaction without `commit` rolls every write back.
pub struct EntityTransaction {
    db: Arc<dyn DocumentStore>,
    tx: DatabaseTransaction,
    versions: HashMap<(Collection, i64), u64>,
}

impl EntityTransaction {
    pub async fn get<T: Entity>(&mut self, id: i64) -> AppResult<Option<T>> {
        match self.db.get_document_tx(&mut self.tx, T::COLLECTION, id).await? {
            Some(doc) => {
                self.versions.insert((T::COLLECTION, id), doc.version);
                Ok(Some(decode(&doc)?))
            }
            None => Ok(None),
        }
    }

    pub async fn require<T: Entity>(&mut self, id: i64) -> AppResult<T> {
        self.get(id).await?.ok_or_else(|| not_found::<T>(id))
    }

    /// All entities of a collection, newest first. Each one can be saved afterwards.
    pub async fn list<T: Entity>(&mut self) -> AppResult<Vec<T>> {
        let docs = self
            .db
            .list_documents_tx(&mut self.tx, DocumentQuery::all(T::COLLECTION))
            .await?;

        docs.iter()
            .map(|doc| {
                self.versions.insert((T::COLLECTION, doc.id), doc.version);
                decode(doc)
            })
            .collect()
    }

    pub async fn save<T: Entity>(&mut self, entity: &T) -> AppResult<()> {
        let key = (T::COLLECTION, entity.entity_id());
        let version = *self.versions.get(&key).ok_or_else(|| {
            AppError::Internal(format!(
                "{} {} saved without being read in this transaction",
                key.0, key.1
            ))
        })?;

        let new_version = self
            .db
            .update_document_tx(&mut self.tx, &encode(entity, version)?)
            .await?;
        self.versions.insert(key, new_version);
        Ok(())
    }

    pub async fn delete<T: Entity>(&mut self, id: i64) -> AppResult<bool> {
        self.versions.remove(&(T::COLLECTION, id));
        self.db
            .delete_document_tx(&mut self.tx, T::COLLECTION, id)
            .await
    }

    pub async fn commit(self) -> AppResult<()> {
        self.tx.commit().await
    }
}
