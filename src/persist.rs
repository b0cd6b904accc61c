use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::storage::{Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Persistence endpoint answered {0}")]
    Status(StatusCode),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Where snapshots are loaded from at startup and sent after each change
#[async_trait]
pub trait Persister: Send + Sync {
    async fn load(&self) -> Result<Option<String>, PersistError>;
    async fn persist(&self, body: String) -> Result<(), PersistError>;
}

/// Talks to a remote `<base>/data` endpoint
pub struct HttpPersister {
    client: reqwest::Client,
    url: String,
}

impl HttpPersister {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/data", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Persister for HttpPersister {
    async fn load(&self) -> Result<Option<String>, PersistError> {
        let response = self.client.get(&self.url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(PersistError::Status(status)),
        }
    }

    async fn persist(&self, body: String) -> Result<(), PersistError> {
        // Only success matters; the response body is ignored.
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PersistError::Status(response.status()));
        }

        Ok(())
    }
}

/// Writes snapshots straight into local storage
pub struct StoragePersister {
    storage: Arc<dyn Storage>,
}

impl StoragePersister {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Persister for StoragePersister {
    async fn load(&self) -> Result<Option<String>, PersistError> {
        Ok(self.storage.load_snapshot().await?)
    }

    async fn persist(&self, body: String) -> Result<(), PersistError> {
        self.storage.save_snapshot(&body).await?;
        Ok(())
    }
}
