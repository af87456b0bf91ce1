pub mod filter;
pub mod sea_orm_adapter;
pub mod supabase_adapter;

use crate::common::errors::CoreError;
use crate::common::settings::DatabaseSettings;
use filter::{Filter, OrderBy};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::sync::Arc;

/// The fluent query contract (spec §4.2), generic over one logical table at
/// a time. `table` names the target; rows and filter values travel as
/// `serde_json::Value` so the same trait covers both the relational and the
/// BaaS adapter without a generic row type per call site. The uniform
/// `{data|null, error|null}` shape the spec requires is this trait's own
/// `Result<T, CoreError>` return type — every method already carries it, so
/// there is no separate wrapper type to construct at call sites.
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    async fn find_many(
        &self,
        table: &str,
        filters: &[Filter],
        order_by: &[OrderBy],
        limit: Option<u64>,
    ) -> Result<Vec<Json>, CoreError>;

    async fn find_one(&self, table: &str, filters: &[Filter]) -> Result<Option<Json>, CoreError>;

    /// Uses the same compiled `WHERE` as `find_many` (spec §4.2 rule).
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, CoreError>;

    async fn insert(&self, table: &str, row: Json) -> Result<Json, CoreError>;

    async fn update(&self, table: &str, filters: &[Filter], patch: Json) -> Result<u64, CoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, CoreError>;
}

/// Selects the configured database backend (spec §6.5 `DATABASE_TYPE`). The
/// relational adapter wraps the same connection loco's `AppContext` already
/// holds; the BaaS adapter needs its own HTTP endpoint and service key.
pub fn build_adapter(
    settings: &DatabaseSettings,
    conn: DatabaseConnection,
) -> Result<Arc<dyn DatabaseAdapter>, CoreError> {
    match settings.backend.as_str() {
        "sea_orm" => Ok(Arc::new(sea_orm_adapter::SeaOrmAdapter::new(conn))),
        "supabase" => {
            let base_url = settings.supabase_url.clone().ok_or_else(|| {
                CoreError::Validation("DATABASE_TYPE=supabase requires supabase_url".to_string())
            })?;
            let api_key = settings.supabase_api_key.clone().ok_or_else(|| {
                CoreError::Validation("DATABASE_TYPE=supabase requires supabase_api_key".to_string())
            })?;
            Ok(Arc::new(supabase_adapter::SupabaseAdapter::new(base_url, api_key)))
        }
        other => Err(CoreError::Validation(format!(
            "unsupported database backend {other:?} (expected \"sea_orm\" or \"supabase\")"
        ))),
    }
}

/// Deserializes one row an adapter returned back into its typed model.
/// Every `_entities::*::Model` already derives `Deserialize`, so this is a
/// thin round trip rather than a hand-maintained column mapping.
pub fn from_row<T: DeserializeOwned>(row: Json) -> Result<T, CoreError> {
    serde_json::from_value(row).map_err(|e| CoreError::Fatal(format!("row shape mismatch: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_fails_closed() {
        let settings = DatabaseSettings {
            backend: "mongo".to_string(),
            supabase_url: None,
            supabase_api_key: None,
        };
        let conn = DatabaseConnection::Disconnected;
        let err = build_adapter(&settings, conn).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn supabase_backend_requires_its_config() {
        let settings = DatabaseSettings {
            backend: "supabase".to_string(),
            supabase_url: None,
            supabase_api_key: None,
        };
        let conn = DatabaseConnection::Disconnected;
        let err = build_adapter(&settings, conn).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
