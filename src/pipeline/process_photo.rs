//! Orchestrates the per-job procedure end to end (spec §4.5). This is the
//! one place that sequences claim → download → decode → derive → upload →
//! commit → bookkeeping; every step below is a thin call into a narrower
//! module so each can be unit-tested (and grounded) independently.

use crate::cache::album_cache::AlbumCache;
use crate::common::errors::CoreError;
use crate::common::settings::PipelineSettings;
use crate::db::DatabaseAdapter;
use crate::models::photos::{self, CompletedDerivatives};
use crate::pipeline::classify::{self, Outcome};
use crate::pipeline::derive;
use crate::cache::album_cache::AlbumPolicy;
use crate::storage::{keys, StorageAdapter};
use ab_glyph::FontRef;
use image::DynamicImage;
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use uuid::Uuid;

pub struct PipelineContext {
    pub db: Arc<dyn DatabaseAdapter>,
    pub storage: Arc<dyn StorageAdapter>,
    pub album_cache: Arc<AlbumCache>,
    pub settings: PipelineSettings,
    /// Bytes backing an optional watermark font, loaded once at startup.
    pub watermark_font_bytes: Option<Vec<u8>>,
}

pub struct ProcessPhotoJob {
    pub photo_id: Uuid,
    pub album_id: Uuid,
    pub max_attempts: i32,
}

/// Runs one attempt. Returns `Ok(())` on a terminal outcome (completed or
/// permanently failed, both already committed) and `Err` when the caller
/// (the queue worker) should schedule a retry.
pub async fn run(ctx: &PipelineContext, job: &ProcessPhotoJob) -> Result<(), CoreError> {
    let Some(photo) = photos::claim_for_processing(ctx.db.as_ref(), job.photo_id).await? else {
        return Ok(());
    };

    let policy = match ctx.album_cache.get_or_load(ctx.db.as_ref(), job.album_id).await {
        Ok(policy) => policy,
        Err(err) => {
            photos::commit_failed(ctx.db.as_ref(), job.photo_id, &err.sanitized_message()).await?;
            return Ok(());
        }
    };

    let original = match ctx.storage.download(&photo.original_key).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return match classify::classify_download_error(&err) {
                Outcome::Terminal => {
                    photos::commit_failed(ctx.db.as_ref(), job.photo_id, "original missing").await?;
                    Ok(())
                }
                Outcome::Retry => Err(requeue_for_retry(ctx, job.photo_id, err).await),
            };
        }
    };

    let decoded = match derive::decode(&original) {
        Ok(d) => d,
        Err(err) => {
            return match classify::classify_decode_error(photo.attempts, job.max_attempts) {
                Outcome::Terminal => {
                    photos::commit_failed(ctx.db.as_ref(), job.photo_id, &err.to_string()).await?;
                    Ok(())
                }
                Outcome::Retry => {
                    Err(requeue_for_retry(ctx, job.photo_id, CoreError::Transient(err.to_string())).await)
                }
            };
        }
    };

    let font = ctx
        .watermark_font_bytes
        .as_deref()
        .and_then(|bytes| FontRef::try_from_slice(bytes).ok());
    let image_overlay = load_image_overlay(ctx, &policy).await;

    let thumb = derive::resize_long_edge(&decoded.image, ctx.settings.thumb_long_edge);
    let thumb = derive::apply_watermark(thumb, &policy, font.as_ref(), image_overlay.as_ref());
    let preview = derive::resize_long_edge(&decoded.image, ctx.settings.preview_long_edge);
    let preview = derive::apply_watermark(preview, &policy, font.as_ref(), image_overlay.as_ref());

    let thumb_bytes = match derive::encode_jpeg(&thumb, 78) {
        Ok(bytes) => bytes,
        Err(err) => return Err(requeue_for_retry(ctx, job.photo_id, encode_to_core_error(err)).await),
    };
    let preview_bytes = match derive::encode_jpeg(&preview, 85) {
        Ok(bytes) => bytes,
        Err(err) => return Err(requeue_for_retry(ctx, job.photo_id, encode_to_core_error(err)).await),
    };

    let thumb_key = keys::thumb_key(job.album_id, job.photo_id);
    let preview_key = keys::preview_key(job.album_id, job.photo_id);

    if let Err(err) = ctx
        .storage
        .upload(&thumb_key, thumb_bytes.into(), Some("image/jpeg"), Default::default())
        .await
    {
        return Err(requeue_for_retry(ctx, job.photo_id, err).await);
    }
    if let Err(err) = ctx
        .storage
        .upload(&preview_key, preview_bytes.into(), Some("image/jpeg"), Default::default())
        .await
    {
        return Err(requeue_for_retry(ctx, job.photo_id, err).await);
    }

    let mut variant_keys = Map::new();
    for preset in enabled_presets(&policy.color_grading) {
        let styled = derive::resize_long_edge(&decoded.image, ctx.settings.preview_long_edge);
        let styled = derive::apply_watermark(styled, &policy, font.as_ref(), image_overlay.as_ref());
        let bytes = match derive::encode_jpeg(&styled, 85) {
            Ok(bytes) => bytes,
            Err(err) => return Err(requeue_for_retry(ctx, job.photo_id, encode_to_core_error(err)).await),
        };
        let key = keys::styled_key(&preset, job.album_id, job.photo_id);
        if let Err(err) = ctx
            .storage
            .upload(&key, bytes.into(), Some("image/jpeg"), Default::default())
            .await
        {
            return Err(requeue_for_retry(ctx, job.photo_id, err).await);
        }
        variant_keys.insert(preset, Json::String(key));
    }

    // Album deleted mid-run: the commit still runs (spec §4.5 retry table
    // B3) — the row just stays hidden behind the album's own tombstone, so
    // there is nothing extra to branch on here. `policy.deleted_at` is only
    // consulted by read paths, not by the writer.
    photos::commit_completed(
        ctx.db.as_ref(),
        job.photo_id,
        CompletedDerivatives {
            thumb_key,
            preview_key,
            variant_keys: if variant_keys.is_empty() {
                None
            } else {
                Some(Json::Object(variant_keys))
            },
            width: decoded.width as i32,
            height: decoded.height as i32,
            rotation: decoded.rotation,
            captured_at: decoded.captured_at,
        },
    )
    .await?;

    Ok(())
}

/// Fetches and decodes the album's configured watermark overlay image
/// (spec §3: `watermark_type == "image"`, overlay named by
/// `watermark_config.image_key`). A missing config, missing key, or failed
/// download/decode all degrade to "no watermark" rather than failing the
/// job — watermarking is cosmetic, not part of the retry-classified steps.
async fn load_image_overlay(ctx: &PipelineContext, policy: &AlbumPolicy) -> Option<DynamicImage> {
    if !policy.watermark_enabled || policy.watermark_type != "image" {
        return None;
    }
    let key = policy
        .watermark_config
        .as_ref()?
        .get("image_key")?
        .as_str()?
        .to_string();
    match ctx.storage.download(&key).await {
        Ok(bytes) => match image::load_from_memory(&bytes) {
            Ok(img) => Some(img),
            Err(err) => {
                tracing::warn!(error = %err, key, "failed to decode watermark overlay image, skipping watermark");
                None
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, key, "failed to download watermark overlay image, skipping watermark");
            None
        }
    }
}

fn enabled_presets(color_grading: &Option<Json>) -> Vec<String> {
    let Some(Json::Object(obj)) = color_grading else {
        return Vec::new();
    };
    let Some(Json::Array(presets)) = obj.get("presets") else {
        return Vec::new();
    };
    presets
        .iter()
        .filter_map(|p| {
            let obj = p.as_object()?;
            let enabled = obj.get("enabled").and_then(Json::as_bool).unwrap_or(false);
            if !enabled {
                return None;
            }
            obj.get("id")?.as_str().map(str::to_string)
        })
        .collect()
}

fn encode_to_core_error(err: derive::DeriveError) -> CoreError {
    CoreError::Transient(err.to_string())
}

/// Reverts a photo claimed as `processing` back to `pending` on a
/// retryable failure, so the next job-queue retry (after its own backoff
/// delay) can claim it again — `claim_for_processing` only ever transitions
/// out of `pending|failed|completed`, never out of `processing` itself.
/// The queue's own backoff/attempt bookkeeping is untouched by this; this
/// only makes the photo row claimable again once that backoff elapses.
async fn requeue_for_retry(ctx: &PipelineContext, photo_id: Uuid, err: CoreError) -> CoreError {
    if let Err(requeue_err) =
        photos::requeue_pending(ctx.db.as_ref(), photo_id, &err.sanitized_message()).await
    {
        tracing::warn!(
            photo_id = %photo_id,
            error = %requeue_err,
            "failed to requeue photo to pending after a retryable processing error"
        );
    }
    err
}
