//! In-memory object store
//!
//! Keeps objects in a sorted map so listings come back in key order, the
//! same order S3 uses. Continuation tokens are opaque to callers: the hex
//! encoded listing prefix and the hex encoded last key, joined by a dot.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ListRequest, ObjectListing, ObjectMetadata, ObjectRecord, ObjectStore, StoredObject};
use crate::error::{Error, Result};

const TOKEN_SEPARATOR: char = '.';

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

impl MemoryObject {
    fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            content_type: self.content_type.clone(),
            content_length: self.data.len() as u64,
            last_modified: self.last_modified,
        }
    }
}

/// Object store held entirely in process memory
pub struct MemoryObjectStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, MemoryObject>>,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

fn encode_token(prefix: &str, last_key: &str) -> String {
    format!("{}{}{}", hex::encode(prefix), TOKEN_SEPARATOR, hex::encode(last_key))
}

fn decode_token(token: &str) -> Result<(String, String)> {
    let invalid = || Error::Backend(format!("invalid continuation token: {}", token));

    let (prefix, last_key) = token.split_once(TOKEN_SEPARATOR).ok_or_else(invalid)?;
    let decode = |part: &str| {
        hex::decode(part)
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .ok_or_else(invalid)
    };
    Ok((decode(prefix)?, decode(last_key)?))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing> {
        let (prefix, lower) = match request {
            ListRequest::Prefix { prefix, .. } => (prefix.clone(), Bound::Unbounded),
            ListRequest::Resume { token, .. } => {
                let (prefix, last_key) = decode_token(token)?;
                (prefix, Bound::Excluded(last_key))
            }
        };
        let max_keys = request.max_keys();

        let objects = self.objects.read().await;
        let mut matching = objects
            .range::<String, _>((lower, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(&prefix));

        let records: Vec<ObjectRecord> = matching
            .by_ref()
            .take(max_keys)
            .map(|(key, object)| ObjectRecord {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.data.len() as u64,
            })
            .collect();

        let next_token = match (records.last(), matching.next()) {
            (Some(last), Some(_)) => Some(encode_token(&prefix, &last.key)),
            _ => None,
        };

        Ok(ObjectListing { records, next_token })
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn head_object(&self, key: &str) -> Result<Option<ObjectMetadata>> {
        Ok(self.objects.read().await.get(key).map(MemoryObject::metadata))
    }

    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        Ok(self.objects.read().await.get(key).map(|object| StoredObject {
            metadata: object.metadata(),
            data: object.data.clone(),
        }))
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let object = MemoryObject {
            data,
            content_type: content_type.to_string(),
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
