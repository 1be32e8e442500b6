//! Object storage for uploaded files
//!
//! Routes talk to an [`ObjectStore`]; the S3 client is used when an endpoint is
//! configured, the in-memory store otherwise.

mod memory;
mod s3_client;
mod types;

pub use memory::MemoryStore;
pub use s3_client::S3Client;
pub use types::{ObjectMetadata, SignedUrl, StorageObject};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key, replacing any existing object
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch an object's bytes and metadata
    async fn get_object(&self, key: &str) -> Result<StorageObject>;

    /// Delete an object; deleting a missing key is not an error
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Produce a time-limited GET URL for an object; a missing key is
    /// `ObjectNotFound`
    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<SignedUrl>;
}

/// Build the storage key for a new upload
///
/// Keys look like `uploads/<class_id>/<uuid>-<sanitized file name>`.
pub fn upload_key(class_id: &str, file_name: &str) -> String {
    format!(
        "uploads/{}/{}-{}",
        class_id,
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// Reduce a client-supplied file name to a safe key segment
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
