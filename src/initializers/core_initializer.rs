//! Boots every process-wide singleton the core needs and starts its
//! background loops (spec §5: process lifecycle). Runs once from
//! `App::initializers`, before loco starts accepting connections — the
//! teacher's `PhotosProcessorInitializer` kicks off a single
//! `BackgroundWorker::perform_later` call here; this one builds the whole
//! core (storage, queue, cache, CDN purger, FTP server, workers) since none
//! of it is framework-managed.

use crate::cache::album_cache::AlbumCache;
use crate::cdn::purge::CdnPurger;
use crate::common::settings::Settings;
use crate::pipeline::process_photo::PipelineContext;
use crate::queue::pg_queue::PgJobQueue;
use crate::queue::JobQueue;
use crate::state::{self, CoreServices};
use crate::storage::StorageAdapter;
use crate::workers;
use async_trait::async_trait;
use loco_rs::app::{AppContext, Initializer};
use loco_rs::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Grace period a shutdown signal waits for in-flight jobs before the
/// worker tasks are force-aborted (spec §5).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct CoreInitializer;

#[async_trait]
impl Initializer for CoreInitializer {
    fn name(&self) -> String {
        "core".to_string()
    }

    async fn before_run(&self, ctx: &AppContext) -> Result<()> {
        let settings = Settings::from_context(ctx);

        let storage: Arc<dyn StorageAdapter> =
            crate::storage::build_adapter(&settings.storage).map_err(loco_rs::Error::from)?;
        storage
            .ensure_bucket()
            .await
            .map_err(loco_rs::Error::from)?;

        let db_adapter = crate::db::build_adapter(&settings.database, ctx.db.clone())
            .map_err(loco_rs::Error::from)?;
        let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(db_adapter.clone()));
        let album_cache = Arc::new(AlbumCache::new(settings.cache.album_cache_ttl_ms));
        let cdn_purger = Arc::new(CdnPurger::new(settings.cdn.clone()));

        let watermark_font_bytes = match &settings.pipeline.watermark_font_path {
            Some(path) => Some(std::fs::read(path).map_err(|err| {
                loco_rs::Error::Message(format!(
                    "failed to read watermark_font_path {path}: {err}"
                ))
            })?),
            None => None,
        };

        state::init(Arc::new(CoreServices {
            storage: storage.clone(),
            queue: queue.clone(),
            cdn_purger: cdn_purger.clone(),
            settings: settings.clone(),
        }));

        let pipeline_ctx = Arc::new(PipelineContext {
            db: db_adapter.clone(),
            storage: storage.clone(),
            album_cache,
            settings: settings.pipeline.clone(),
            watermark_font_bytes,
        });

        let shutdown = CancellationToken::new();

        let mut handles =
            workers::spawn_process_photo_workers(pipeline_ctx, queue.clone(), settings.queue.clone(), shutdown.clone());
        handles.push(workers::spawn_cdn_purge_worker(
            cdn_purger,
            queue.clone(),
            shutdown.clone(),
        ));
        handles.push(workers::spawn_recovery_sweep(
            db_adapter.clone(),
            queue.clone(),
            settings.pipeline.recovery_horizon_ms,
            settings.pipeline.recovery_sweep_interval_ms,
            shutdown.clone(),
        ));
        handles.push(workers::spawn_lease_reclaim_sweep(
            queue.clone(),
            settings.queue.lease_reclaim_interval_ms,
            shutdown.clone(),
        ));

        let ftp_settings = settings.ftp.clone();
        let ftp_db = db_adapter.clone();
        let ftp_storage = storage.clone();
        let ftp_queue = queue.clone();
        tokio::spawn(async move {
            if let Err(err) = crate::ftp::server::run(ftp_settings, ftp_db, ftp_storage, ftp_queue).await {
                tracing::error!(error = %err, "ftp ingest server exited");
            }
        });

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, draining workers");
            shutdown.cancel();
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            for handle in &handles {
                if !handle.is_finished() {
                    tracing::warn!("aborting worker past grace period");
                    handle.abort();
                }
            }
        });

        Ok(())
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
