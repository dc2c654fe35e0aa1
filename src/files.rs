//! File Operations
//!
//! `FileService` is what the HTTP handlers call. It owns the object store
//! handle, the listing coordinator and the optional content generator, and
//! bounds every backend call with the configured deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::generate::{ContentGenerator, GeneratedFileType};
use crate::listing::{ListingCoordinator, ListingPage, ListingQuery};
use crate::storage::{ObjectMetadata, ObjectStore, StoredObject};

/// Whether an upload created a new object or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    Updated,
}

impl UploadOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, UploadOutcome::Created)
    }
}

/// Result of a generate-and-store request
#[derive(Debug, Clone)]
pub struct GeneratedUpload {
    pub outcome: UploadOutcome,
    pub file_type: GeneratedFileType,
    pub content_type: String,
    pub size_bytes: u64,
}

/// File operations over one bucket
#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn ObjectStore>,
    generator: Option<Arc<dyn ContentGenerator>>,
    listing: ListingCoordinator,
    deadline: Duration,
}

impl FileService {
    pub fn new(store: Arc<dyn ObjectStore>, deadline: Duration) -> Self {
        Self {
            listing: ListingCoordinator::new(Arc::clone(&store), deadline),
            store,
            generator: None,
            deadline,
        }
    }

    /// Enable content generation
    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    pub fn generation_enabled(&self) -> bool {
        self.generator.is_some()
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::BackendTimeout(self.deadline)),
        }
    }

    /// List one page of files
    pub async fn list(&self, query: &ListingQuery) -> Result<ListingPage> {
        self.listing.list(query).await
    }

    /// Store `data` at `path`, replacing any existing object
    pub async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<UploadOutcome> {
        let path = validate_path(path)?;

        let existed = self.bounded(self.store.object_exists(path)).await?;
        let size = data.len();
        self.bounded(self.store.put_object(path, data, content_type)).await?;

        let outcome = if existed {
            UploadOutcome::Updated
        } else {
            UploadOutcome::Created
        };
        tracing::info!("Uploaded {} ({} bytes, {:?})", path, size, outcome);
        Ok(outcome)
    }

    /// Fetch contents and metadata
    pub async fn fetch(&self, path: &str) -> Result<StoredObject> {
        let path = validate_path(path)?;
        self.bounded(self.store.get_object(path))
            .await?
            .ok_or_else(|| Error::FileNotFound(path.to_string()))
    }

    /// Fetch metadata only
    pub async fn metadata(&self, path: &str) -> Result<ObjectMetadata> {
        let path = validate_path(path)?;
        self.bounded(self.store.head_object(path))
            .await?
            .ok_or_else(|| Error::FileNotFound(path.to_string()))
    }

    /// Delete an existing file
    pub async fn delete(&self, path: &str) -> Result<()> {
        let path = validate_path(path)?;

        if !self.bounded(self.store.object_exists(path)).await? {
            return Err(Error::FileNotFound(path.to_string()));
        }
        self.bounded(self.store.delete_object(path)).await?;

        tracing::info!("Deleted {}", path);
        Ok(())
    }

    /// Generate content from `prompt` and store it at `path`
    pub async fn generate(
        &self,
        path: &str,
        prompt: &str,
        file_type: GeneratedFileType,
    ) -> Result<GeneratedUpload> {
        let generator = self.generator.as_ref().ok_or(Error::GenerationDisabled)?;
        let path = validate_path(path)?;
        if prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt must not be empty".into()));
        }

        // The generator carries its own HTTP timeout
        let content = generator.generate(prompt, file_type).await?;
        let size_bytes = content.data.len() as u64;
        let outcome = self.upload(path, content.data, &content.content_type).await?;

        Ok(GeneratedUpload {
            outcome,
            file_type,
            content_type: content.content_type,
            size_bytes,
        })
    }
}

fn validate_path(path: &str) -> Result<&str> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::InvalidRequest("file path must not be empty".into()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GeneratedContent;
    use crate::storage::MemoryObjectStore;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl ContentGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str, _file_type: GeneratedFileType) -> Result<GeneratedContent> {
            Ok(GeneratedContent {
                data: Bytes::from(prompt.to_uppercase()),
                content_type: "text/plain".into(),
            })
        }
    }

    fn service() -> (Arc<MemoryObjectStore>, FileService) {
        let store = Arc::new(MemoryObjectStore::new("test-bucket"));
        let service = FileService::new(store.clone(), Duration::from_secs(5));
        (store, service)
    }

    #[tokio::test]
    async fn test_upload_reports_created_then_updated() {
        let (_, service) = service();

        let first = service
            .upload("docs/a.txt", Bytes::from_static(b"one"), "text/plain")
            .await
            .unwrap();
        assert_eq!(first, UploadOutcome::Created);

        let second = service
            .upload("docs/a.txt", Bytes::from_static(b"two"), "text/plain")
            .await
            .unwrap();
        assert_eq!(second, UploadOutcome::Updated);

        let object = service.fetch("docs/a.txt").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_, service) = service();

        assert!(matches!(service.fetch("nope.txt").await, Err(Error::FileNotFound(p)) if p == "nope.txt"));
        assert!(matches!(service.metadata("nope.txt").await, Err(Error::FileNotFound(_))));
        assert!(matches!(service.delete("nope.txt").await, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let (store, service) = service();
        service
            .upload("a.bin", Bytes::from_static(b"\x00\x01"), "application/octet-stream")
            .await
            .unwrap();

        service.delete("a.bin").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_metadata_reports_type_and_length() {
        let (_, service) = service();
        service
            .upload("page.html", Bytes::from_static(b"<p>hi</p>"), "text/html")
            .await
            .unwrap();

        let meta = service.metadata("page.html").await.unwrap();
        assert_eq!(meta.content_type, "text/html");
        assert_eq!(meta.content_length, 9);
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let (_, service) = service();
        let err = service
            .upload("", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_without_generator_is_disabled() {
        let (_, service) = service();
        assert!(!service.generation_enabled());

        let err = service
            .generate("notes.txt", "write notes", GeneratedFileType::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationDisabled));
    }

    #[tokio::test]
    async fn test_generate_stores_content() {
        let (_, service) = service();
        let service = service.with_generator(Arc::new(EchoGenerator));

        let upload = service
            .generate("notes.txt", "write notes", GeneratedFileType::Text)
            .await
            .unwrap();
        assert!(upload.outcome.is_created());
        assert_eq!(upload.size_bytes, 11);

        let object = service.fetch("notes.txt").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"WRITE NOTES"));
        assert_eq!(object.metadata.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_prompt() {
        let (_, service) = service();
        let service = service.with_generator(Arc::new(EchoGenerator));

        let err = service
            .generate("notes.txt", "   ", GeneratedFileType::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
