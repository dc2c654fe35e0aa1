//! Listing contract against a real S3-compatible endpoint
//!
//! Run with a disposable bucket, e.g. MinIO:
//!
//!   WOLFFILES_TEST_BUCKET=wolffiles-test S3_ENDPOINT_URL=http://127.0.0.1:9000 \
//!   AWS_ACCESS_KEY_ID=minioadmin AWS_SECRET_ACCESS_KEY=minioadmin \
//!   cargo test --features integration --test s3_contract

#![cfg(feature = "integration")]

use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

use wolffiles::config::{BackendKind, StorageConfig};
use wolffiles::listing::{ListingCoordinator, ListingQuery};
use wolffiles::storage::{self, ObjectStore};

fn test_config() -> Option<StorageConfig> {
    let bucket = std::env::var("WOLFFILES_TEST_BUCKET").ok()?;
    Some(StorageConfig {
        backend: BackendKind::S3,
        bucket,
        endpoint: std::env::var("S3_ENDPOINT_URL").ok(),
        path_style: true,
        ..StorageConfig::default()
    })
}

#[tokio::test]
async fn s3_pages_resume_with_token_and_page_size() {
    let Some(config) = test_config() else {
        eprintln!("WOLFFILES_TEST_BUCKET not set, skipping");
        return;
    };
    let store = storage::connect(&config).await.unwrap();

    let prefix = format!("contract-{}/", Uuid::new_v4());
    let keys: Vec<String> = (0..5).map(|i| format!("{prefix}file{i}.txt")).collect();
    for key in &keys {
        store.put_object(key, Bytes::from_static(b"x"), "text/plain").await.unwrap();
    }

    let coordinator = ListingCoordinator::new(store.clone(), Duration::from_secs(30));
    let mut seen = Vec::new();
    let mut page = coordinator
        .list(&ListingQuery::fresh(Some(prefix.as_str())).with_page_size(2))
        .await
        .unwrap();
    loop {
        assert!(page.files.len() <= 2);
        seen.extend(page.files.iter().map(|f| f.path.clone()));
        match page.next_continuation_token.clone() {
            Some(token) => {
                page = coordinator
                    .list(&ListingQuery::resume(token).with_page_size(2))
                    .await
                    .unwrap();
            }
            None => break,
        }
    }
    assert_eq!(seen, keys);

    for key in &keys {
        store.delete_object(key).await.unwrap();
    }
    assert!(!store.object_exists(&keys[0]).await.unwrap());
}
