//! Dynamic row-to-JSON conversion. `sea_orm::QueryResult` doesn't expose
//! column introspection, so the relational adapter drops to the
//! `sqlx` pool sea_orm wraps and walks columns the same way a generic
//! ad-hoc-query endpoint would.

use serde_json::{Map, Value as Json};
use sqlx::{Column, Row, ValueRef};

pub fn pg_row_to_json(row: &sqlx::postgres::PgRow) -> Json {
    let mut out = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => Json::Null,
            Ok(_) => {
                if let Ok(v) = row.try_get::<String, _>(i) {
                    Json::String(v)
                } else if let Ok(v) = row.try_get::<i64, _>(i) {
                    Json::Number(v.into())
                } else if let Ok(v) = row.try_get::<i32, _>(i) {
                    Json::Number(v.into())
                } else if let Ok(v) = row.try_get::<f64, _>(i) {
                    serde_json::Number::from_f64(v).map_or(Json::Null, Json::Number)
                } else if let Ok(v) = row.try_get::<bool, _>(i) {
                    Json::Bool(v)
                } else if let Ok(v) = row.try_get::<Json, _>(i) {
                    v
                } else if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(i) {
                    Json::String(v.to_rfc3339())
                } else if let Ok(v) = row.try_get::<uuid::Uuid, _>(i) {
                    Json::String(v.to_string())
                } else {
                    Json::Null
                }
            }
            Err(_) => Json::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    Json::Object(out)
}

pub fn sqlite_row_to_json(row: &sqlx::sqlite::SqliteRow) -> Json {
    let mut out = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => Json::Null,
            Ok(_) => {
                if let Ok(v) = row.try_get::<String, _>(i) {
                    Json::String(v)
                } else if let Ok(v) = row.try_get::<i64, _>(i) {
                    Json::Number(v.into())
                } else if let Ok(v) = row.try_get::<f64, _>(i) {
                    serde_json::Number::from_f64(v).map_or(Json::Null, Json::Number)
                } else if let Ok(v) = row.try_get::<bool, _>(i) {
                    Json::Bool(v)
                } else {
                    Json::Null
                }
            }
            Err(_) => Json::Null,
        };
        out.insert(column.name().to_string(), value);
    }
    Json::Object(out)
}
