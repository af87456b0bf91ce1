//! Best-effort CDN invalidation (spec §4.7). Grounded on the teacher's
//! `common/api_client.rs` (`reqwest::Client` with a connect/request timeout
//! pair, status-based error matching) generalized from a single-endpoint job
//! API to a batched purge call; batching/pacing borrows `governor`'s rate
//! limiter the way the rest of the pack leans on a maintained crate instead
//! of a hand-rolled sleep loop.

use crate::common::settings::CdnSettings;
use nonzero_ext::nonzero;
use reqwest::Client;
use std::time::Duration;

const BATCH_SIZE: usize = 30;
const BATCH_PACING_MS: u64 = 100;
const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PurgeOutcome {
    pub purged_urls: Vec<String>,
    pub failed_urls: Vec<String>,
    pub success: bool,
}

pub struct CdnPurger {
    http_client: Client,
    settings: CdnSettings,
}

impl CdnPurger {
    /// # Panics
    /// if the underlying HTTP client can't be built.
    #[must_use]
    pub fn new(settings: CdnSettings) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(15))
                .build()
                .expect("failed to create HTTP client"),
            settings,
        }
    }

    /// Never returns an `Err` — deletion of photos must not fail because a
    /// CDN is unreachable (spec §4.7). Missing configuration or any
    /// transport error downgrades to `success: false` with every URL in
    /// `failed_urls` instead.
    pub async fn purge(&self, urls: &[String]) -> PurgeOutcome {
        let (Some(zone_id), Some(api_token)) =
            (self.settings.zone_id.as_ref(), self.settings.api_token.as_ref())
        else {
            return PurgeOutcome {
                purged_urls: Vec::new(),
                failed_urls: urls.to_vec(),
                success: false,
            };
        };

        let quota = governor::Quota::with_period(Duration::from_millis(BATCH_PACING_MS))
            .unwrap_or_else(|| governor::Quota::per_second(nonzero!(10u32)));
        let limiter = governor::RateLimiter::direct(quota);

        let mut purged = Vec::new();
        let mut failed = Vec::new();

        for batch in urls.chunks(BATCH_SIZE) {
            limiter.until_ready().await;
            match self.purge_batch(zone_id, api_token, batch).await {
                Ok(()) => purged.extend(batch.iter().cloned()),
                Err(_) => failed.extend(batch.iter().cloned()),
            }
        }

        PurgeOutcome {
            success: failed.is_empty(),
            purged_urls: purged,
            failed_urls: failed,
        }
    }

    async fn purge_batch(
        &self,
        zone_id: &str,
        api_token: &str,
        urls: &[String],
    ) -> Result<(), reqwest::Error> {
        let base = self.settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base}/zones/{zone_id}/purge_cache");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_token)
            .json(&serde_json::json!({ "files": urls }))
            .send()
            .await?;
        response.error_for_status().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::settings::CdnSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(base_url: String) -> CdnSettings {
        CdnSettings {
            zone_id: Some("zone-1".to_string()),
            api_token: Some("token-1".to_string()),
            base_url: Some(base_url),
        }
    }

    #[tokio::test]
    async fn missing_config_fails_closed_without_any_request() {
        let purger = CdnPurger::new(CdnSettings {
            zone_id: None,
            api_token: None,
            base_url: None,
        });
        let urls = vec!["https://cdn.example.com/a.jpg".to_string()];
        let outcome = purger.purge(&urls).await;
        assert!(!outcome.success);
        assert_eq!(outcome.failed_urls, urls);
        assert!(outcome.purged_urls.is_empty());
    }

    #[tokio::test]
    async fn successful_purge_reports_every_url_as_purged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/zones/zone-1/purge_cache"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let purger = CdnPurger::new(settings_for(server.uri()));
        let urls: Vec<String> = (0..3)
            .map(|i| format!("https://cdn.example.com/{i}.jpg"))
            .collect();

        let outcome = purger.purge(&urls).await;
        assert!(outcome.success);
        assert_eq!(outcome.purged_urls, urls);
        assert!(outcome.failed_urls.is_empty());
    }

    #[tokio::test]
    async fn transient_5xx_never_panics_and_reports_failed_urls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/zones/zone-1/purge_cache"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let purger = CdnPurger::new(settings_for(server.uri()));
        let urls = vec!["https://cdn.example.com/a.jpg".to_string()];

        let outcome = purger.purge(&urls).await;
        assert!(!outcome.success);
        assert_eq!(outcome.failed_urls, urls);
    }

    /// Spec §4.7: batched to at most 30 URLs per request (S6 scenario).
    #[tokio::test]
    async fn batches_requests_at_thirty_urls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/zones/zone-1/purge_cache"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let purger = CdnPurger::new(settings_for(server.uri()));
        let urls: Vec<String> = (0..45)
            .map(|i| format!("https://cdn.example.com/{i}.jpg"))
            .collect();

        let outcome = purger.purge(&urls).await;
        assert!(outcome.success);
        assert_eq!(outcome.purged_urls.len(), 45);
    }
}
