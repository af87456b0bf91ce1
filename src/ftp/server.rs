//! Builds and runs the FTP listener (spec §4.6 / §6.4). Started once from
//! `initializers::core_initializer` as a detached task; it runs for the
//! lifetime of the process and is not expected to return.

use crate::common::settings::FtpSettings;
use crate::db::DatabaseAdapter;
use crate::ftp::authenticator::AlbumAuthenticator;
use crate::ftp::storage_backend::AlbumScopedBackend;
use crate::queue::JobQueue;
use crate::storage::StorageAdapter;
use std::sync::Arc;

pub async fn run(
    settings: FtpSettings,
    db: Arc<dyn DatabaseAdapter>,
    storage: Arc<dyn StorageAdapter>,
    queue: Arc<dyn JobQueue>,
) -> anyhow::Result<()> {
    let staging_root = std::path::PathBuf::from(&settings.root_dir);
    let authenticator = Arc::new(AlbumAuthenticator::new(db.clone(), staging_root));
    let backend = Arc::new(AlbumScopedBackend::new(db, storage, queue));
    let pasv_host = settings.pasv_url.clone();

    let server = libunftp::ServerBuilder::new(Box::new(move || backend.clone()))
        .authenticator(authenticator)
        .passive_ports(settings.pasv_start..settings.pasv_end)
        .passive_host(pasv_host.as_str())
        .build()?;

    tracing::info!(port = settings.port, "ftp ingest server listening");
    server.listen(format!("0.0.0.0:{}", settings.port)).await?;
    Ok(())
}
