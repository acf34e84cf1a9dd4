// Core infrastructure modules
pub mod cache;            // LRU cache
pub mod database;         // Document store interface
pub mod entity_store;     // Typed, versioned access to documents
pub mod id_generator;     // Snowflake id generation
pub mod media;            // Image uploads
pub mod middleware;       // ViewerContext middleware and extractor
pub mod security;         // Password hashing and bearer tokens
pub mod sqlite_database;  // SQLite document store
pub mod viewer;           // Viewer context

// Re-export core infrastructure components
pub use cache::Cache;
pub use database::{Collection, DatabaseTransaction, Document, DocumentQuery, DocumentStore};
pub use entity_store::{Entity, EntityStore, EntityTransaction};
pub use id_generator::IdGenerator;
pub use media::{LocalMediaStore, MediaDescriptor, MediaStore};
pub use security::{AuthProvider, JwtAuthProvider};
pub use sqlite_database::SqliteDatabase;
pub use viewer::ViewerContext;
