//! In-memory object store
//!
//! Used when no S3 endpoint is configured and in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::types::{ObjectMetadata, SignedUrl, StorageObject};
use super::ObjectStore;
use crate::error::{Result, StorageError};

/// Object store backed by a map
#[derive(Clone)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, (ObjectMetadata, Vec<u8>)>>>,
    signing_key: Arc<str>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_signing_key(&uuid::Uuid::new_v4().to_string())
    }
}

impl MemoryStore {
    /// Store with a random signing key
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signing_key(signing_key: &str) -> Self {
        Self {
            objects: Arc::default(),
            signing_key: Arc::from(signing_key),
        }
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_key.as_bytes());
        hasher.update([0]);
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(expires.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether a `memory://` URL was signed by this store and has not expired
    pub fn verify(&self, key: &str, expires: i64, signature: &str) -> bool {
        expires > Utc::now().timestamp() && self.signature(key, expires) == signature
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: data.len() as i64,
            last_modified: Some(Utc::now()),
            content_type: Some(content_type.to_string()),
        };

        self.objects
            .write()
            .await
            .insert(key.to_string(), (metadata, data));

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<StorageObject> {
        let objects = self.objects.read().await;
        let (metadata, data) = objects
            .get(key)
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))?;

        Ok(StorageObject {
            metadata: metadata.clone(),
            data: data.clone(),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<SignedUrl> {
        if !self.contains(key).await {
            return Err(StorageError::ObjectNotFound(key.to_string()).into());
        }

        let expires_at = Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| StorageError::Presign(e.to_string()))?;
        let expires = expires_at.timestamp();

        let signature = self.signature(key, expires);

        Ok(SignedUrl {
            url: format!(
                "memory://{}?expires={}&signature={}",
                urlencoding::encode(key),
                expires,
                signature
            ),
            expires_at,
        })
    }
}
