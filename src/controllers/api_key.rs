//! Service-to-service auth for §6.3: every endpoint the core exposes to the
//! web tier is gated by a shared `X-API-Key` header instead of the
//! `auth::JWT` extractor the teacher uses for end-user sessions — the web
//! tier is the authorized caller here, not an end user, and the spec is
//! explicit that "end-user authentication and role checks" are the web
//! tier's concern, not the core's (§1 Non-goals).

use crate::common::settings::Settings;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use loco_rs::app::AppContext;
use loco_rs::Error;

pub struct ApiKey;

impl<S> FromRequestParts<S> for ApiKey
where
    AppContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let settings = Settings::from_context(&ctx);

        let provided = parts
            .headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing X-API-Key".to_string()))?;

        if !crate::common::constant_time_eq(provided.as_bytes(), settings.worker_api_key.as_bytes()) {
            return Err(Error::Unauthorized("invalid X-API-Key".to_string()));
        }

        Ok(ApiKey)
    }
}
