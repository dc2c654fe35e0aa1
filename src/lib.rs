//! WolfFiles - HTTP File API over Object Storage
//!
//! A small Rust service that exposes the files in one object-storage bucket
//! over HTTP: upload, download, metadata, delete and paginated listing, plus
//! optional AI content generation that stores its output as a new file.
//!
//! # Architecture
//!
//! Handlers in [`api`] call a [`files::FileService`], which talks to the
//! bucket through the [`storage::ObjectStore`] trait. Listing goes through
//! the [`listing::ListingCoordinator`], which enforces the page-size bounds
//! and the rule that a continuation token cannot be combined with a
//! directory filter.
//!
//! # Features
//!
//! - S3 and S3-compatible backends (MinIO, R2, ...) via `rust-s3`
//! - In-memory backend for tests and local development
//! - Opaque continuation tokens for listing
//! - Text, image and text-to-speech generation through an OpenAI-compatible API
//! - Correlation ids and request tracing on every request

pub mod config;
pub mod error;
pub mod storage;
pub mod listing;
pub mod files;
pub mod generate;
pub mod api;

pub use config::WolfFilesConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfFilesConfig;
    pub use crate::error::{Error, Result};
    pub use crate::files::{FileService, UploadOutcome};
    pub use crate::generate::{ContentGenerator, GeneratedContent, GeneratedFileType};
    pub use crate::listing::{FileRecord, ListingCoordinator, ListingPage, ListingQuery};
    pub use crate::storage::{MemoryObjectStore, ObjectStore};
}
