//! Upload URL stores keyed by source fingerprint
//!
//! A store remembers where an unfinished upload lives so a later attempt on
//! the same source resumes instead of starting over.

use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;

/// Storage for in-progress upload URLs
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// URL of an unfinished upload for `fingerprint`
    async fn get(&self, fingerprint: &str) -> Option<String>;

    /// Remember `url` for `fingerprint`
    async fn put(&self, fingerprint: &str, url: &str) -> Result<()>;

    /// Forget `fingerprint`
    async fn remove(&self, fingerprint: &str) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryUploadStore {
    urls: DashMap<String, String>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn get(&self, fingerprint: &str) -> Option<String> {
        self.urls.get(fingerprint).map(|url| url.value().clone())
    }

    async fn put(&self, fingerprint: &str, url: &str) -> Result<()> {
        self.urls.insert(fingerprint.to_string(), url.to_string());
        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> Result<()> {
        self.urls.remove(fingerprint);
        Ok(())
    }
}

/// Store persisted as a JSON object in a file, so uploads survive restarts
#[derive(Debug)]
pub struct FileUploadStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUploadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> HashMap<String, String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable upload store {}: {}", self.path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    async fn save(&self, urls: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(urls)?).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadStore for FileUploadStore {
    async fn get(&self, fingerprint: &str) -> Option<String> {
        let _guard = self.lock.lock().await;
        self.load().await.remove(fingerprint)
    }

    async fn put(&self, fingerprint: &str, url: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut urls = self.load().await;
        urls.insert(fingerprint.to_string(), url.to_string());
        self.save(&urls).await
    }

    async fn remove(&self, fingerprint: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut urls = self.load().await;
        if urls.remove(fingerprint).is_some() {
            self.save(&urls).await?;
        }
        Ok(())
    }
}
