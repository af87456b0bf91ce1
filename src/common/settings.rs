use loco_rs::app::AppContext;
use serde::{Deserialize, Serialize};

/// Dual-endpoint storage configuration (spec §4.1's "dual-endpoint rule"):
/// data-plane operations may use an internal endpoint while presigned URLs
/// are always signed against the publicly reachable one.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageSettings {
    pub backend: String,
    pub endpoint_host: String,
    pub endpoint_port: u16,
    pub use_ssl: bool,
    pub public_url: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

/// Backend selection for C2 (spec §6.5 `DATABASE_TYPE`). `backend` names
/// which `db::DatabaseAdapter` implementation `db::build_adapter` hands
/// back; `supabase_url`/`supabase_api_key` are only consulted when
/// `backend == "supabase"`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_api_key: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            supabase_url: None,
            supabase_api_key: None,
        }
    }
}

fn default_database_backend() -> String {
    "sea_orm".to_string()
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QueueSettings {
    #[serde(default = "default_photo_concurrency")]
    pub photo_concurrency: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// How often the queue-side visibility-timeout sweep runs (spec §4.3);
    /// should be well under the shortest `lease_secs` passed to `claim` so a
    /// crashed worker's job is reclaimable promptly rather than at the end
    /// of its full lease.
    #[serde(default = "default_lease_reclaim_interval_ms")]
    pub lease_reclaim_interval_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineSettings {
    #[serde(default = "default_recovery_horizon_ms")]
    pub recovery_horizon_ms: i64,
    #[serde(default = "default_recovery_sweep_interval_ms")]
    pub recovery_sweep_interval_ms: u64,
    #[serde(default = "default_thumb_edge")]
    pub thumb_long_edge: u32,
    #[serde(default = "default_preview_edge")]
    pub preview_long_edge: u32,
    /// Path to a TTF/OTF file backing text watermarks (spec §9 "a
    /// pre-rasterized glyph layer"). Absent means text watermarks silently
    /// no-op rather than fail the run (see `pipeline::derive::apply_watermark`).
    #[serde(default)]
    pub watermark_font_path: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CacheSettings {
    #[serde(default = "default_album_cache_ttl_ms")]
    pub album_cache_ttl_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FtpSettings {
    pub port: u16,
    pub pasv_url: String,
    pub pasv_start: u16,
    pub pasv_end: u16,
    pub root_dir: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CdnSettings {
    pub zone_id: Option<String>,
    pub api_token: Option<String>,
    /// Overrides the Cloudflare API base URL, mirroring the teacher's
    /// `ApiClient::new(base_url, endpoint)` constructor shape
    /// (`common/api_client.rs`). Defaults to the real Cloudflare endpoint;
    /// tests point this at a local mock server instead.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    pub storage: StorageSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub ftp: FtpSettings,
    #[serde(default)]
    pub cdn: CdnSettings,
    pub worker_api_key: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            photo_concurrency: default_photo_concurrency(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            lease_reclaim_interval_ms: default_lease_reclaim_interval_ms(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            recovery_horizon_ms: default_recovery_horizon_ms(),
            recovery_sweep_interval_ms: default_recovery_sweep_interval_ms(),
            thumb_long_edge: default_thumb_edge(),
            preview_long_edge: default_preview_edge(),
            watermark_font_path: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            album_cache_ttl_ms: default_album_cache_ttl_ms(),
        }
    }
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            zone_id: None,
            api_token: None,
            base_url: None,
        }
    }
}

fn default_photo_concurrency() -> usize {
    4
}
fn default_max_attempts() -> i32 {
    5
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_lease_reclaim_interval_ms() -> u64 {
    60 * 1_000
}
fn default_recovery_horizon_ms() -> i64 {
    15 * 60 * 1000
}
fn default_recovery_sweep_interval_ms() -> u64 {
    5 * 60 * 1000
}
fn default_thumb_edge() -> u32 {
    400
}
fn default_preview_edge() -> u32 {
    1600
}
fn default_album_cache_ttl_ms() -> u64 {
    60_000
}

impl Settings {
    /// Get a settings object from app context.
    ///
    /// # Panics
    ///
    /// When the settings field can't be found in config, or when it can't be
    /// deserialized to the expected format. Environment variables backing
    /// these values must be loaded before the first use of the db/storage
    /// clients (spec §4.2's "Backend selection" rule) — `Settings::from_context`
    /// is the single place that reads them, called once from `App::boot`.
    #[allow(clippy::must_use_candidate)]
    pub fn from_context(ctx: &AppContext) -> Self {
        let settings_value = ctx
            .config
            .settings
            .clone()
            .expect("No settings found in config.");
        serde_json::from_value(settings_value).expect("Error deserializing settings.")
    }
}
