pub mod keys;
pub mod s3;

use crate::common::errors::CoreError;
use crate::common::settings::StorageSettings;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub key: String,
    pub size: i64,
    pub mtime: chrono::DateTime<chrono::Utc>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub etag: String,
}

/// The uniform object-store contract (spec §4.1). `key` is an opaque,
/// `/`-delimited path; adapters never interpret it.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn download(&self, key: &str) -> Result<Bytes, CoreError>;

    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
        meta: HashMap<String, String>,
    ) -> Result<UploadOutcome, CoreError>;

    /// `NotFound` is treated as success (spec §4.1).
    async fn delete(&self, key: &str) -> Result<(), CoreError>;

    async fn exists(&self, key: &str) -> Result<bool, CoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, CoreError>;

    async fn copy(&self, src: &str, dst: &str) -> Result<(), CoreError>;

    async fn presign_put(&self, key: &str, ttl_secs: u64) -> Result<String, CoreError>;

    async fn presign_get(
        &self,
        key: &str,
        ttl_secs: u64,
        response_content_disposition: Option<&str>,
    ) -> Result<String, CoreError>;

    async fn init_multipart(&self, key: &str) -> Result<String, CoreError>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        bytes: Bytes,
    ) -> Result<UploadedPart, CoreError>;

    /// Adapters MAY refuse with `Unsupported` (spec §4.1).
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        ttl_secs: u64,
    ) -> Result<String, CoreError>;

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<(i32, String)>,
    ) -> Result<(), CoreError>;

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), CoreError>;

    /// Absence of this capability is not an error (spec §4.1); the default
    /// no-op covers adapters with no bucket-provisioning concept.
    async fn ensure_bucket(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Selects the configured storage backend (spec §6.5 `STORAGE_TYPE`,
/// carried here as `settings.storage.backend`). `s3` is the only backend
/// this core ships with; an unrecognized value fails boot loudly instead of
/// silently defaulting to S3, since a typo'd config value would otherwise
/// point the core at the wrong object store without any signal.
pub fn build_adapter(settings: &StorageSettings) -> Result<Arc<dyn StorageAdapter>, CoreError> {
    match settings.backend.as_str() {
        "s3" => Ok(Arc::new(s3::S3StorageAdapter::from_settings(settings))),
        other => Err(CoreError::Validation(format!(
            "unsupported storage backend {other:?} (expected \"s3\")"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backend: &str) -> StorageSettings {
        StorageSettings {
            backend: backend.to_string(),
            endpoint_host: "localhost".to_string(),
            endpoint_port: 9000,
            use_ssl: false,
            public_url: None,
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            bucket: "bucket".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn s3_backend_builds_an_adapter() {
        assert!(build_adapter(&settings("s3")).is_ok());
    }

    #[test]
    fn unknown_backend_fails_closed_instead_of_defaulting_to_s3() {
        let err = build_adapter(&settings("azure-blob")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
