//! Object storage for uploaded files (resumes, photos, video answers).
//!
//! Handlers talk to [`ObjectStore`]; `S3ObjectStore` is what `AppState` carries and tests
//! use the in-memory store below.

use std::future::Future;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> S3Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talentiq-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

/// `{prefix}/{user_id}/{uuid}.{ext}`
pub fn object_key(prefix: &str, user_id: Uuid, extension: &str) -> String {
    format!("{prefix}/{user_id}/{}.{extension}", Uuid::new_v4())
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store {key}: {e}")))?;
        info!(key, size, "Stored upload");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {key}: {e}")))?;
        info!(key, "Deleted upload");
        Ok(())
    }
}

/// Stores `body` under `key`, then runs `commit`. Nothing is committed when the upload
/// fails, and the object is removed again when `commit` fails.
pub async fn with_stored_object<T, F, Fut>(
    store: &dyn ObjectStore,
    key: &str,
    body: Bytes,
    content_type: &str,
    commit: F,
) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    store.put(key, body, content_type).await?;
    match commit().await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(cleanup) = store.delete(key).await {
                warn!(key, "Could not remove orphaned upload: {cleanup}");
            }
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::memory::{FailingObjectStore, MemoryObjectStore};
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let user = Uuid::new_v4();
        let key = object_key("resumes", user, "pdf");
        assert!(key.starts_with(&format!("resumes/{user}/")));
        assert!(key.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_failed_upload_skips_commit() {
        let flag = AtomicBool::new(false);
        let committed = &flag;
        let result = with_stored_object(
            &FailingObjectStore,
            "resumes/u/r.pdf",
            Bytes::from_static(b"%PDF"),
            "application/pdf",
            move || async move {
                committed.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_commit_removes_object() {
        let store = MemoryObjectStore::default();
        let result: Result<(), AppError> = with_stored_object(
            &store,
            "resumes/u/r.pdf",
            Bytes::from_static(b"%PDF"),
            "application/pdf",
            || async { Err(AppError::Conflict("email taken".into())) },
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(!store.contains("resumes/u/r.pdf"));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_successful_commit_keeps_object() {
        let store = MemoryObjectStore::default();
        let value = with_stored_object(
            &store,
            "photos/u/p.png",
            Bytes::from_static(b"png"),
            "image/png",
            || async { Ok(7) },
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert!(store.contains("photos/u/p.png"));
    }
}
