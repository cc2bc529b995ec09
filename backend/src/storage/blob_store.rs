//! Object-store abstraction: get/put/exists with version tags, so the
//! correction log can do compare-and-swap overwrites and tests can run
//! against an in-memory double.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("object {0} changed since it was read")]
    PreconditionFailed(String),
    #[error("stored object is malformed: {0}")]
    Malformed(String),
}

/// Opaque version tag of a stored object (the ETag for S3).
pub type Version = String;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Object bytes plus version tag, or None if the object does not exist.
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StorageError>;

    /// Conditional write. `expected` of None requires the object to be
    /// absent (create); Some(version) requires the stored version to still
    /// match (replace). A failed condition is `PreconditionFailed`.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        expected: Option<&Version>,
    ) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn fetch(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let version = output.e_tag().unwrap_or_default().to_string();
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(Some((body.into_bytes().to_vec(), version)))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(StorageError::Backend(service_err.to_string()))
                }
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        expected: Option<&Version>,
    ) -> Result<(), StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type);

        request = match expected {
            Some(version) => request.if_match(version),
            None => request.if_none_match("*"),
        };

        request.send().await.map_err(|err| {
            // S3 reports a lost conditional write as 412 (If-Match) or
            // 409/412 (If-None-Match during concurrent creates).
            let status = err
                .raw_response()
                .map(|r| r.status().as_u16())
                .unwrap_or_default();
            if status == 412 || status == 409 {
                StorageError::PreconditionFailed(key.to_string())
            } else {
                StorageError::Backend(err.into_service_error().to_string())
            }
        })?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(service_err.to_string()))
                }
            }
        }
    }
}
