//! Object Storage Module
//!
//! The seam between WolfFiles and the bucket that actually holds the bytes.
//! Everything above this module talks to an `Arc<dyn ObjectStore>` handed
//! in at construction time, so the S3 client and the in-memory store are
//! interchangeable.

mod memory;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::{BackendKind, StorageConfig};
use crate::error::Result;

pub use self::memory::MemoryObjectStore;
pub use self::s3::S3ObjectStore;

/// Content type used when the uploader does not provide one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One page request against the backend's prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRequest {
    /// Start a listing of keys beginning with `prefix` ("" lists everything)
    Prefix { prefix: String, max_keys: usize },
    /// Resume a listing from a token previously issued by the backend
    Resume { token: String, max_keys: usize },
}

impl ListRequest {
    pub fn max_keys(&self) -> usize {
        match self {
            ListRequest::Prefix { max_keys, .. } | ListRequest::Resume { max_keys, .. } => *max_keys,
        }
    }
}

/// Raw object record as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// A single page of backend listing results
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub records: Vec<ObjectRecord>,
    /// Resume point for the next page; backends may report "" for none
    pub next_token: Option<String>,
}

/// Object metadata (HEAD)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
}

/// Object metadata plus contents (GET)
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub data: Bytes,
}

/// Byte-oriented object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store serves
    fn bucket(&self) -> &str;

    /// Fetch one page of keys
    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing>;

    /// Check whether a key exists
    async fn object_exists(&self, key: &str) -> Result<bool>;

    /// Fetch metadata, `None` when the key does not exist
    async fn head_object(&self, key: &str) -> Result<Option<ObjectMetadata>>;

    /// Fetch contents, `None` when the key does not exist
    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Create or overwrite an object
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Remove an object
    async fn delete_object(&self, key: &str) -> Result<()>;
}

/// Build the configured object store
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        BackendKind::S3 => {
            let store = S3ObjectStore::new(config)?;
            tracing::info!(
                "Using S3 bucket '{}' in region {}{}",
                config.bucket,
                config.region,
                config
                    .endpoint
                    .as_deref()
                    .map(|e| format!(" at {}", e))
                    .unwrap_or_default()
            );
            Ok(Arc::new(store))
        }
        BackendKind::Memory => {
            let name = if config.bucket.is_empty() { "memory" } else { config.bucket.as_str() };
            tracing::warn!("Using in-memory bucket '{}' - contents are lost on restart", name);
            Ok(Arc::new(MemoryObjectStore::new(name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = StorageConfig {
            backend: BackendKind::Memory,
            bucket: "scratch".into(),
            ..StorageConfig::default()
        };

        let store = connect(&config).await.unwrap();
        assert_eq!(store.bucket(), "scratch");
        assert!(!store.object_exists("anything").await.unwrap());
    }

    #[test]
    fn test_list_request_max_keys() {
        let fresh = ListRequest::Prefix { prefix: "a/".into(), max_keys: 7 };
        let resume = ListRequest::Resume { token: "t".into(), max_keys: 3 };
        assert_eq!(fresh.max_keys(), 7);
        assert_eq!(resume.max_keys(), 3);
    }
}
