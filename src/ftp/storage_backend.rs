//! Decorates `unftp-sbe-fs`'s local filesystem backend with the per-album
//! ingest hook (spec §4.6 steps 1-6). libunftp's own `examples/` directory
//! uses exactly this wrap-and-intercept shape for backends that need to do
//! something after a transfer completes (there: encrypt; here: promote the
//! staged file to object storage and enqueue processing) — no teacher
//! precedent, this is a crate-documented extension point.

use crate::common::errors::CoreError;
use crate::db::DatabaseAdapter;
use crate::ftp::authenticator::AlbumUser;
use crate::models::photos;
use crate::queue::{EnqueueOptions, JobQueue};
use crate::storage::{keys, StorageAdapter};
use async_trait::async_trait;
use libunftp::storage::{Error, ErrorKind, Fileinfo, StorageBackend};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use unftp_sbe_fs::Filesystem;
use uuid::Uuid;

/// Resolves a client-supplied upload path against the session's staging
/// root and rejects anything that would climb out of it (`..` components,
/// absolute paths), collapsing the attempt to the root itself. No teacher
/// precedent for FTP, but the same `path_clean::clean` + `starts_with`
/// check the teacher uses to guard `controllers::download` against
/// directory traversal.
fn sanitize_relative_path(root: &Path, path: &Path) -> PathBuf {
    let cleaned = path_clean::clean(root.join(path));
    cleaned
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

pub struct AlbumScopedBackend {
    db: Arc<dyn DatabaseAdapter>,
    storage: Arc<dyn StorageAdapter>,
    queue: Arc<dyn JobQueue>,
}

impl AlbumScopedBackend {
    #[must_use]
    pub fn new(db: Arc<dyn DatabaseAdapter>, storage: Arc<dyn StorageAdapter>, queue: Arc<dyn JobQueue>) -> Self {
        Self { db, storage, queue }
    }

    async fn inner_for(&self, user: &AlbumUser) -> std::io::Result<Filesystem> {
        Ok(Filesystem::new(user.staging_root.path()))
    }

    /// Steps 1-6 of the ingest procedure, run right after the local staging
    /// write finishes (the FTP protocol's "file-stream close"). Never
    /// returns an error to the caller — failures are logged and the staged
    /// file is left in place so the client's own retry is observable, per
    /// spec: "do not terminate the FTP session".
    async fn promote_to_storage(&self, user: &AlbumUser, staged_path: &Path, filename: &str) {
        if let Err(err) = self.try_promote(user, staged_path, filename).await {
            tracing::warn!(
                album_id = %user.album_id,
                filename,
                error = %err,
                "ftp ingest: failed to promote staged upload"
            );
        }
    }

    async fn try_promote(
        &self,
        user: &AlbumUser,
        staged_path: &Path,
        filename: &str,
    ) -> Result<(), CoreError> {
        let bytes = tokio::fs::read(staged_path)
            .await
            .map_err(|e| CoreError::Transient(e.to_string()))?;
        let file_size = bytes.len() as i64;

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let mime_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let photo_id = Uuid::new_v4();
        let original_key = keys::raw_key(user.album_id, photo_id, extension);

        let mut meta = HashMap::new();
        meta.insert("original-filename".to_string(), filename.to_string());
        self.storage
            .upload(&original_key, bytes.into(), Some(&mime_type), meta)
            .await?;

        let row = serde_json::json!({
            "id": photo_id,
            "album_id": user.album_id,
            "filename": filename,
            "original_key": original_key,
            "mime_type": mime_type,
            "file_size": file_size,
            "status": photos::PhotoStatus::Pending.as_str(),
        });
        self.db.insert("photos", row).await?;

        self.queue
            .enqueue(
                crate::pipeline::recovery::PROCESS_PHOTO_QUEUE,
                serde_json::json!({
                    "photo_id": photo_id,
                    "album_id": user.album_id,
                    "original_key": original_key,
                }),
                EnqueueOptions {
                    job_id: Some(photo_id.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        tokio::fs::remove_file(staged_path)
            .await
            .map_err(|e| CoreError::Transient(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend<AlbumUser> for AlbumScopedBackend {
    type Metadata = <Filesystem as StorageBackend<AlbumUser>>::Metadata;

    async fn metadata<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<Self::Metadata, Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.metadata(user, path).await
    }

    async fn list<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>, Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.list(user, path).await
    }

    async fn get<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
        start_pos: u64,
    ) -> Result<Box<dyn AsyncRead + Send + Sync + Unpin>, Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.get(user, path, start_pos).await
    }

    async fn put<P: AsRef<Path> + Send, R: AsyncRead + Send + Sync + 'static + Unpin>(
        &self,
        user: &AlbumUser,
        input: R,
        path: P,
        start_pos: u64,
    ) -> Result<u64, Error> {
        let path = sanitize_relative_path(user.staging_root.path(), path.as_ref());
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        let written = fs.put(user, input, &path, start_pos).await?;

        let staged_path = user.staging_root.path().join(&path);
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        self.promote_to_storage(user, &staged_path, &filename).await;

        Ok(written)
    }

    async fn del<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<(), Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.del(user, path).await
    }

    async fn mkd<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<(), Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.mkd(user, path).await
    }

    async fn rename<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        from: P,
        to: P,
    ) -> Result<(), Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.rename(user, from, to).await
    }

    async fn rmd<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<(), Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.rmd(user, path).await
    }

    async fn cwd<P: AsRef<Path> + Send + std::fmt::Debug>(
        &self,
        user: &AlbumUser,
        path: P,
    ) -> Result<(), Error> {
        let fs = self.inner_for(user).await.map_err(fs_err)?;
        fs.cwd(user, path).await
    }
}

fn fs_err(err: std::io::Error) -> Error {
    Error::new(ErrorKind::LocalError, err)
}
