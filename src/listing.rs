//! Paginated file listing
//!
//! Turns a `ListingQuery` into exactly one prefix-listing call against the
//! object store and translates the raw records and continuation token into
//! a `ListingPage`.
//!
//! Once a caller holds a continuation token it must not also constrain the
//! listing by directory: the token already encodes the backend's filter and
//! position, and re-applying a prefix can silently shift page boundaries.
//! Backends do not reliably reject that combination, so it is refused here
//! before any request is made.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::storage::{ListRequest, ObjectRecord, ObjectStore};

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Smallest accepted page size
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// One file in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "file_path")]
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
}

impl From<ObjectRecord> for FileRecord {
    fn from(record: ObjectRecord) -> Self {
        Self {
            path: record.key,
            last_modified: record.last_modified,
            size_bytes: record.size,
        }
    }
}

/// What to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub page_size: u32,
    pub directory_prefix: Option<String>,
    pub continuation_token: Option<String>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            directory_prefix: None,
            continuation_token: None,
        }
    }
}

impl ListingQuery {
    /// Start a fresh listing, optionally restricted to a directory prefix
    pub fn fresh(directory: Option<&str>) -> Self {
        Self {
            directory_prefix: directory.map(str::to_string),
            ..Self::default()
        }
        .normalized()
    }

    /// Resume a listing from a previously returned token
    pub fn resume(token: impl Into<String>) -> Self {
        Self {
            continuation_token: Some(token.into()),
            ..Self::default()
        }
        .normalized()
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Empty strings mean "not supplied"
    pub fn normalized(mut self) -> Self {
        self.directory_prefix = self.directory_prefix.filter(|d| !d.is_empty());
        self.continuation_token = self.continuation_token.filter(|t| !t.is_empty());
        self
    }

    /// Check the page-size bounds and the token/directory exclusivity rule
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::invalid_query(
                format!(
                    "page_size must be between {} and {}",
                    MIN_PAGE_SIZE, MAX_PAGE_SIZE
                ),
                self.page_size.to_string(),
            ));
        }

        if let (Some(_), Some(directory)) = (&self.continuation_token, &self.directory_prefix) {
            return Err(Error::invalid_query(
                "page_token is mutually exclusive with directory",
                directory.clone(),
            ));
        }

        Ok(())
    }

    fn to_request(&self) -> ListRequest {
        let max_keys = self.page_size as usize;
        match &self.continuation_token {
            Some(token) => ListRequest::Resume {
                token: token.clone(),
                max_keys,
            },
            None => ListRequest::Prefix {
                prefix: self.directory_prefix.clone().unwrap_or_default(),
                max_keys,
            },
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub files: Vec<FileRecord>,
    #[serde(rename = "next_page_token")]
    pub next_continuation_token: Option<String>,
}

impl ListingPage {
    /// Whether another page is available
    pub fn has_more(&self) -> bool {
        self.next_continuation_token.is_some()
    }
}

/// Drives paginated listings against an object store
#[derive(Clone)]
pub struct ListingCoordinator {
    store: Arc<dyn ObjectStore>,
    deadline: Duration,
}

impl ListingCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// List one page of files
    pub async fn list(&self, query: &ListingQuery) -> Result<ListingPage> {
        query.validate()?;

        let request = query.to_request();
        let listing = match timeout(self.deadline, self.store.list_objects(&request)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::BackendTimeout(self.deadline)),
        };

        let page = ListingPage {
            files: listing.records.into_iter().map(FileRecord::from).collect(),
            next_continuation_token: listing.next_token.filter(|t| !t.is_empty()),
        };

        tracing::debug!(
            "Listed {} files from '{}' (more: {})",
            page.files.len(),
            self.store.bucket(),
            page.has_more()
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, ObjectListing, ObjectMetadata, StoredObject};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    const EXAMPLE_KEYS: [&str; 5] = [
        "folder1/file1.txt",
        "folder1/file2.txt",
        "folder2/file3.txt",
        "folder2/subfolder/file4.txt",
        "file5.txt",
    ];

    async fn coordinator_with(keys: &[&str]) -> ListingCoordinator {
        let store = MemoryObjectStore::new("test-bucket");
        for key in keys {
            store
                .put_object(key, Bytes::from_static(b"Hello, world!"), "text/plain")
                .await
                .unwrap();
        }
        ListingCoordinator::new(Arc::new(store), Duration::from_secs(5))
    }

    /// Records the requests it sees and answers with a canned listing
    struct RecordingStore {
        requests: Mutex<Vec<ListRequest>>,
        next_token: Option<String>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        fn bucket(&self) -> &str {
            "recording"
        }
        async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(ObjectListing {
                records: Vec::new(),
                next_token: self.next_token.clone(),
            })
        }
        async fn object_exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn head_object(&self, _key: &str) -> Result<Option<ObjectMetadata>> {
            Ok(None)
        }
        async fn get_object(&self, _key: &str) -> Result<Option<StoredObject>> {
            Ok(None)
        }
        async fn put_object(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_object(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    struct SlowStore;

    #[async_trait]
    impl ObjectStore for SlowStore {
        fn bucket(&self) -> &str {
            "slow"
        }
        async fn list_objects(&self, _request: &ListRequest) -> Result<ObjectListing> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ObjectListing::default())
        }
        async fn object_exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn head_object(&self, _key: &str) -> Result<Option<ObjectMetadata>> {
            Ok(None)
        }
        async fn get_object(&self, _key: &str) -> Result<Option<StoredObject>> {
            Ok(None)
        }
        async fn put_object(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_object(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_query_defaults_and_normalization() {
        let query = ListingQuery::fresh(Some(""));
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert!(query.directory_prefix.is_none());
        assert!(ListingQuery::resume("").continuation_token.is_none());
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_page_size_bounds() {
        for size in [MIN_PAGE_SIZE, 50, MAX_PAGE_SIZE] {
            assert!(ListingQuery::default().with_page_size(size).validate().is_ok());
        }
        for size in [0, MAX_PAGE_SIZE + 1] {
            let err = ListingQuery::default().with_page_size(size).validate().unwrap_err();
            assert!(matches!(err, Error::InvalidQuery { .. }));
        }
    }

    #[test]
    fn test_token_and_directory_are_exclusive() {
        let query = ListingQuery {
            page_size: 10,
            directory_prefix: Some("dir".into()),
            continuation_token: Some("token".into()),
        };
        let err = query.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));

        // page size may accompany a token
        assert!(ListingQuery::resume("token").with_page_size(25).validate().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_backend() {
        let store = Arc::new(RecordingStore {
            requests: Mutex::new(Vec::new()),
            next_token: None,
        });
        let coordinator = ListingCoordinator::new(store.clone(), Duration::from_secs(5));

        let query = ListingQuery {
            page_size: 10,
            directory_prefix: Some("dir".into()),
            continuation_token: Some("token".into()),
        };
        assert!(coordinator.list(&query).await.is_err());
        assert!(store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resume_does_not_resupply_prefix() {
        let store = Arc::new(RecordingStore {
            requests: Mutex::new(Vec::new()),
            next_token: Some(String::new()),
        });
        let coordinator = ListingCoordinator::new(store.clone(), Duration::from_secs(5));

        let page = coordinator
            .list(&ListingQuery::resume("abc").with_page_size(3))
            .await
            .unwrap();
        // empty-string sentinel means exhausted
        assert!(page.next_continuation_token.is_none());

        coordinator.list(&ListingQuery::fresh(Some("docs/"))).await.unwrap();

        let requests = store.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            ListRequest::Resume { token: "abc".into(), max_keys: 3 }
        );
        assert_eq!(
            requests[1],
            ListRequest::Prefix { prefix: "docs/".into(), max_keys: 10 }
        );
    }

    #[tokio::test]
    async fn test_list_everything() {
        let coordinator = coordinator_with(&EXAMPLE_KEYS).await;
        let page = coordinator
            .list(&ListingQuery::default().with_page_size(100))
            .await
            .unwrap();
        assert_eq!(page.files.len(), 5);
        assert!(!page.has_more());
        assert!(page.files.iter().all(|f| f.size_bytes == 13));
    }

    #[tokio::test]
    async fn test_directory_filter() {
        let coordinator = coordinator_with(&EXAMPLE_KEYS).await;

        let page = coordinator.list(&ListingQuery::fresh(Some("folder1"))).await.unwrap();
        assert_eq!(page.files.len(), 2);
        assert!(page.next_continuation_token.is_none());

        let page = coordinator.list(&ListingQuery::fresh(Some("file"))).await.unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].path, "file5.txt");
    }

    #[tokio::test]
    async fn test_paging_through_prefix() {
        let coordinator = coordinator_with(&EXAMPLE_KEYS).await;

        let first = coordinator
            .list(&ListingQuery::fresh(Some("folder")).with_page_size(2))
            .await
            .unwrap();
        assert_eq!(first.files.len(), 2);
        let token = first.next_continuation_token.clone().unwrap();

        let second = coordinator.list(&ListingQuery::resume(token)).await.unwrap();
        let paths: Vec<_> = second.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["folder2/file3.txt", "folder2/subfolder/file4.txt"]);
        assert!(second.next_continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_every_page_respects_page_size() {
        let keys: Vec<String> = (0..23).map(|i| format!("file{:02}.txt", i)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let coordinator = coordinator_with(&key_refs).await;

        for page_size in [1, 4, 10, 23, 100] {
            let mut query = ListingQuery::default().with_page_size(page_size);
            let mut seen = Vec::new();
            loop {
                let page = coordinator.list(&query).await.unwrap();
                assert!(page.files.len() <= page_size as usize);
                seen.extend(page.files.into_iter().map(|f| f.path));
                match page.next_continuation_token {
                    Some(token) => query = ListingQuery::resume(token).with_page_size(page_size),
                    None => break,
                }
            }
            assert_eq!(seen, keys);
        }
    }

    #[tokio::test]
    async fn test_repeated_query_is_stable() {
        let coordinator = coordinator_with(&EXAMPLE_KEYS).await;
        let query = ListingQuery::fresh(Some("folder"));
        let a = coordinator.list(&query).await.unwrap();
        let b = coordinator.list(&query).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_backend_deadline() {
        let coordinator = ListingCoordinator::new(Arc::new(SlowStore), Duration::from_millis(50));
        let err = coordinator.list(&ListingQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::BackendTimeout(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn test_page_wire_shape() {
        let page = ListingPage {
            files: vec![FileRecord {
                path: "a.txt".into(),
                last_modified: DateTime::parse_from_rfc3339("2021-09-01T12:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
                size_bytes: 512,
            }],
            next_continuation_token: None,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["files"][0]["file_path"], "a.txt");
        assert_eq!(json["files"][0]["size_bytes"], 512);
        assert!(json["next_page_token"].is_null());
    }
}
