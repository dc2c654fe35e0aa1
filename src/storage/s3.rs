//! S3 object store
//!
//! Backed by the pure-Rust `rust-s3` client so it works against AWS S3 and
//! S3-compatible services (MinIO, R2, ...) alike. Each trait call is exactly
//! one S3 request.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use ::s3::bucket::Bucket;
use ::s3::creds::Credentials;
use ::s3::error::S3Error;
use ::s3::region::Region;

use super::{
    ListRequest, ObjectListing, ObjectMetadata, ObjectRecord, ObjectStore, StoredObject,
    DEFAULT_CONTENT_TYPE,
};
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Object store talking to an S3 bucket
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    name: String,
}

impl S3ObjectStore {
    /// Create a store for the configured bucket. No request is made here.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|e| Error::Config(format!("invalid storage.region '{}': {}", config.region, e)))?,
        };

        let credentials = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(Some(access_key.as_str()), Some(secret_key.as_str()), None, None, None)
            }
            _ => Credentials::default(),
        }
        .map_err(|e| Error::Config(format!("failed to resolve S3 credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            name: config.bucket.clone(),
        })
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn status_error(operation: &str, key: &str, status: u16) -> Error {
    Error::Backend(format!("{} '{}' returned HTTP {}", operation, key, status))
}

/// ListObjectsV2 reports `LastModified` as ISO 8601
fn parse_listing_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Backend(format!("unparseable LastModified '{}': {}", value, e)))
}

/// HEAD/GET report `Last-Modified` as an HTTP date
fn parse_http_time(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn header<'a>(headers: &'a std::collections::HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing> {
        let (prefix, token) = match request {
            ListRequest::Prefix { prefix, .. } => (prefix.clone(), None),
            // The token already carries the prefix and position
            ListRequest::Resume { token, .. } => (String::new(), Some(token.clone())),
        };

        let (result, status) = self
            .bucket
            .list_page(prefix, None, token, None, Some(request.max_keys()))
            .await?;
        if !is_success(status) {
            return Err(status_error("ListObjectsV2", &self.name, status));
        }

        let records = result
            .contents
            .into_iter()
            .map(|object| {
                Ok(ObjectRecord {
                    last_modified: parse_listing_time(&object.last_modified)?,
                    key: object.key,
                    size: object.size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "S3 ListObjectsV2 on '{}': {} keys, truncated={}",
            self.name,
            records.len(),
            result.is_truncated
        );

        Ok(ObjectListing {
            records,
            next_token: result.next_continuation_token,
        })
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        Ok(self.head_object(key).await?.is_some())
    }

    async fn head_object(&self, key: &str) -> Result<Option<ObjectMetadata>> {
        match self.bucket.head_object(key).await {
            Ok((_, 404)) | Err(S3Error::HttpFailWithBody(404, _)) => Ok(None),
            Ok((head, status)) if is_success(status) => Ok(Some(ObjectMetadata {
                content_type: head.content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                content_length: head.content_length.unwrap_or(0).max(0) as u64,
                last_modified: parse_http_time(head.last_modified.as_deref()),
            })),
            Ok((_, status)) => Err(status_error("HeadObject", key, status)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        let response = match self.bucket.get_object(key).await {
            Ok(response) => response,
            Err(S3Error::HttpFailWithBody(404, _)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match response.status_code() {
            404 => Ok(None),
            status if is_success(status) => {
                let headers = response.headers().clone();
                let data = response.bytes().clone();
                Ok(Some(StoredObject {
                    metadata: ObjectMetadata {
                        content_type: header(&headers, "content-type")
                            .unwrap_or(DEFAULT_CONTENT_TYPE)
                            .to_string(),
                        content_length: data.len() as u64,
                        last_modified: parse_http_time(header(&headers, "last-modified")),
                    },
                    data,
                }))
            }
            status => Err(status_error("GetObject", key, status)),
        }
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await?;
        if !is_success(response.status_code()) {
            return Err(status_error("PutObject", key, response.status_code()));
        }
        tracing::debug!("S3 PutObject: {}/{} ({} bytes)", self.name, key, data.len());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let response = self.bucket.delete_object(key).await?;
        if !is_success(response.status_code()) {
            return Err(status_error("DeleteObject", key, response.status_code()));
        }
        tracing::debug!("S3 DeleteObject: {}/{}", self.name, key);
        Ok(())
    }
}
