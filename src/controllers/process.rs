//! HTTP capabilities the core offers to the web tier (spec §6.3). All three
//! endpoints sit behind the `api_key::ApiKey` extractor instead of the
//! teacher's `auth::JWT` — the web tier itself is the authorized caller
//! here, not an end user (spec §1: "the core trusts its callers").

use crate::controllers::api_key::ApiKey;
use crate::pipeline::recovery::PROCESS_PHOTO_QUEUE;
use crate::queue::EnqueueOptions;
use crate::state;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};

const DEFAULT_PRESIGN_TTL_SECS: u64 = 5 * 60;

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub photo_id: String,
    pub album_id: String,
    pub original_key: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub enqueued: bool,
}

/// `POST /process` (spec §6.3): enqueues a `process-photo` job keyed by
/// `photoId`, relying on the queue's own dedup (spec §4.3) to make repeat
/// calls for the same photo harmless rather than checking for one here.
/// Responds `202` instead of `2xx` when the enqueue itself errors, so the
/// web tier can record a warning without failing the user's upload action.
async fn process(_: ApiKey, Json(body): Json<ProcessRequest>) -> Result<impl IntoResponse> {
    let services = state::get();
    let payload = serde_json::json!({
        "photo_id": body.photo_id,
        "album_id": body.album_id,
        "original_key": body.original_key,
    });

    let enqueued = services
        .queue
        .enqueue(
            PROCESS_PHOTO_QUEUE,
            payload,
            EnqueueOptions {
                job_id: Some(body.photo_id.clone()),
                ..Default::default()
            },
        )
        .await;

    match enqueued {
        Ok(()) => Ok((StatusCode::OK, Json(ProcessResponse { enqueued: true }))),
        Err(err) => {
            tracing::warn!(error = %err, photo_id = %body.photo_id, "enqueue failed, reporting 202");
            Ok((StatusCode::ACCEPTED, Json(ProcessResponse { enqueued: false })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PresignGetRequest {
    pub key: String,
    pub response_content_disposition: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PresignGetResponse {
    pub url: String,
}

/// `POST /presign/get` (spec §6.3). TTL is the spec's fixed 5-minute default
/// — the endpoint does not accept a caller-supplied TTL, since the core
/// only promises a default, not a negotiable one.
async fn presign_get(_: ApiKey, Json(body): Json<PresignGetRequest>) -> Result<Response> {
    let services = state::get();
    let url = services
        .storage
        .presign_get(
            &body.key,
            DEFAULT_PRESIGN_TTL_SECS,
            body.response_content_disposition.as_deref(),
        )
        .await
        .map_err(loco_rs::Error::from)?;
    format::json(PresignGetResponse { url })
}

#[derive(Debug, Deserialize)]
pub struct CleanupFileRequest {
    pub key: String,
}

/// `POST /cleanup-file` (spec §6.3): deletes a single orphaned key, used
/// when an ingest row is abandoned before a job ever ran.
async fn cleanup_file(_: ApiKey, Json(body): Json<CleanupFileRequest>) -> Result<Response> {
    let services = state::get();
    services
        .storage
        .delete(&body.key)
        .await
        .map_err(loco_rs::Error::from)?;
    format::empty_json()
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/core")
        .add("/process", post(process))
        .add("/presign/get", post(presign_get))
        .add("/cleanup-file", post(cleanup_file))
}
