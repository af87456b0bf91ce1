//! Per-album FTP login (spec §4.6): `username` resolves to an album (UUID
//! first, then `slug`), `password` must equal that album's `upload_token`.
//! No teacher precedent; the `Authenticator`/`UserDetail` pair is libunftp's
//! own extension point for exactly this kind of multi-tenant login.

use crate::db::DatabaseAdapter;
use crate::models::albums;
use async_trait::async_trait;
use libunftp::auth::{AuthenticationError, Authenticator, Credentials, UserDetail};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The authenticated identity libunftp carries for the rest of the session.
/// `staging_root` is this session's private, auto-cleaned-up subdirectory;
/// no other connection (even for the same album) ever shares it, and
/// dropping the last session handle removes it even if the session never
/// uploaded anything or the control connection died mid-transfer.
#[derive(Debug, Clone)]
pub struct AlbumUser {
    pub album_id: Uuid,
    pub staging_root: Arc<tempfile::TempDir>,
}

impl fmt::Display for AlbumUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "album:{}", self.album_id)
    }
}

impl UserDetail for AlbumUser {}

pub struct AlbumAuthenticator {
    db: Arc<dyn DatabaseAdapter>,
    staging_root: std::path::PathBuf,
}

impl AlbumAuthenticator {
    #[must_use]
    pub fn new(db: Arc<dyn DatabaseAdapter>, staging_root: std::path::PathBuf) -> Self {
        Self { db, staging_root }
    }
}

#[async_trait]
impl Authenticator<AlbumUser> for AlbumAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        creds: &Credentials,
    ) -> Result<AlbumUser, AuthenticationError> {
        let password = creds
            .password
            .as_deref()
            .ok_or(AuthenticationError::BadPassword)?;

        let album = albums::find_by_id_or_slug(&*self.db, username)
            .await
            .map_err(|_| AuthenticationError::ImplPropagated)?
            .ok_or(AuthenticationError::BadUser)?;

        if !crate::common::constant_time_eq(password.as_bytes(), album.upload_token.as_bytes()) {
            return Err(AuthenticationError::BadPassword);
        }

        let album_root = self.staging_root.join(album.id.to_string());
        tokio::fs::create_dir_all(&album_root)
            .await
            .map_err(|_| AuthenticationError::ImplPropagated)?;
        let session_root = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(&album_root)
            .map_err(|_| AuthenticationError::ImplPropagated)?;

        Ok(AlbumUser {
            album_id: album.id,
            staging_root: Arc::new(session_root),
        })
    }
}
