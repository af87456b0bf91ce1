use super::{ObjectMeta, StorageAdapter, UploadOutcome, UploadedPart};
use crate::common::errors::CoreError;
use crate::common::settings::StorageSettings;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

/// S3-compatible adapter (spec §4.1). Honors the dual-endpoint rule: `client`
/// talks to the internal/data-plane endpoint, `presign_client` signs against
/// the publicly reachable one (falling back to the internal endpoint when no
/// public URL is configured).
pub struct S3StorageAdapter {
    client: Client,
    presign_client: Client,
    bucket: String,
}

impl S3StorageAdapter {
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let scheme = if settings.use_ssl { "https" } else { "http" };
        let internal_endpoint = format!("{scheme}://{}:{}", settings.endpoint_host, settings.endpoint_port);
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "galleryd-static",
        );

        let base = aws_sdk_s3::Config::builder()
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version_latest();

        let client = Client::from_conf(base.clone().endpoint_url(internal_endpoint).build());

        let public_endpoint = settings.public_url.clone().unwrap_or_else(|| {
            format!("{scheme}://{}:{}", settings.endpoint_host, settings.endpoint_port)
        });
        let presign_client = Client::from_conf(base.endpoint_url(public_endpoint).build());

        Self {
            client,
            presign_client,
            bucket: settings.bucket.clone(),
        }
    }

    fn classify<E: std::fmt::Debug>(context: &str, err: SdkError<E>) -> CoreError {
        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                CoreError::Transient(format!("{context}: {err:?}"))
            }
            SdkError::ServiceError(service_err) => {
                CoreError::Transient(format!("{context}: {:?}", service_err.raw()))
            }
            _ => CoreError::Fatal(format!("{context}: {err:?}")),
        }
    }
}

#[async_trait]
impl StorageAdapter for S3StorageAdapter {
    async fn download(&self, key: &str) -> Result<Bytes, CoreError> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        let out = match out {
            Ok(out) => out,
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => {
                return Err(CoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(Self::classify("download", e)),
        };
        let bytes = out
            .body
            .collect()
            .await
            .map_err(|e| CoreError::Transient(e.to_string()))?;
        Ok(bytes.into_bytes())
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
        meta: HashMap<String, String>,
    ) -> Result<UploadOutcome, CoreError> {
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }
        for (k, v) in meta {
            req = req.metadata(k, v);
        }
        let out = req
            .send()
            .await
            .map_err(|e| Self::classify("upload", e))?;
        Ok(UploadOutcome {
            etag: out.e_tag().map(str::to_string),
            version_id: out.version_id().map(str::to_string),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        // NotFound is treated as ok (spec §4.1); S3 DeleteObject is already
        // idempotent in that sense, so no special-casing is needed here.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::classify("delete", e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => Ok(false),
            Err(e) => Err(Self::classify("exists", e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, CoreError> {
        let mut out = Vec::new();
        let mut continuation = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| Self::classify("list", e))?;
            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                out.push(ObjectMeta {
                    key: key.to_string(),
                    size: obj.size().unwrap_or_default(),
                    mtime: obj
                        .last_modified()
                        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), 0))
                        .unwrap_or_else(chrono::Utc::now),
                    etag: obj.e_tag().map(str::to_string),
                });
            }
            if resp.is_truncated().unwrap_or(false) {
                continuation = resp.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }
        Ok(out)
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), CoreError> {
        let source = format!("{}/{src}", self.bucket);
        match self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(dst)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => {
                Err(CoreError::NotFound(src.to_string()))
            }
            Err(e) => Err(Self::classify("copy", e)),
        }
    }

    async fn presign_put(&self, key: &str, ttl_secs: u64) -> Result<String, CoreError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl_secs))
            .map_err(|e| CoreError::Fatal(e.to_string()))?;
        let presigned = self
            .presign_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_get(
        &self,
        key: &str,
        ttl_secs: u64,
        response_content_disposition: Option<&str>,
    ) -> Result<String, CoreError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl_secs))
            .map_err(|e| CoreError::Fatal(e.to_string()))?;
        let mut req = self.presign_client.get_object().bucket(&self.bucket).key(key);
        if let Some(cd) = response_content_disposition {
            req = req.response_content_disposition(cd);
        }
        let presigned = req
            .presigned(config)
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    async fn init_multipart(&self, key: &str) -> Result<String, CoreError> {
        let out = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::classify("init_multipart", e))?;
        out.upload_id()
            .map(str::to_string)
            .ok_or_else(|| CoreError::Fatal("no uploadId returned".to_string()))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        bytes: Bytes,
    ) -> Result<UploadedPart, CoreError> {
        let out = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Self::classify("upload_part", e))?;
        Ok(UploadedPart {
            etag: out.e_tag().unwrap_or_default().to_string(),
        })
    }

    /// Refuses presigned multipart parts (spec §4.1 allows `Unsupported`):
    /// the dual-endpoint presign client would need per-part UploadPart
    /// signing support this adapter doesn't expose yet.
    async fn presign_part(
        &self,
        _key: &str,
        _upload_id: &str,
        _part_number: i32,
        _ttl_secs: u64,
    ) -> Result<String, CoreError> {
        Err(CoreError::Unsupported(
            "presigned multipart parts are not supported by this adapter".to_string(),
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<(i32, String)>,
    ) -> Result<(), CoreError> {
        let completed_parts = parts
            .into_iter()
            .map(|(n, etag)| {
                CompletedPart::builder()
                    .part_number(n)
                    .e_tag(etag)
                    .build()
            })
            .collect();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| CoreError::Fatal(format!("complete_multipart: {e:?}")))?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), CoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| Self::classify("abort_multipart", e))?;
        Ok(())
    }

    async fn ensure_bucket(&self) -> Result<(), CoreError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => {
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(|e| CoreError::Fatal(format!("create_bucket: {e:?}")))?;
                Ok(())
            }
            Err(e) => Err(Self::classify("ensure_bucket", e)),
        }
    }
}
