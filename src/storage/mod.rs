pub mod sqlite;

use async_trait::async_trait;

pub use sqlite::SqliteStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Backing store for the serialized job snapshot
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_snapshot(&self) -> Result<Option<String>>;
    async fn save_snapshot(&self, body: &str) -> Result<()>;
}
