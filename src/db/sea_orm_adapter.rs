//! Relational adapter (spec §4.2): compiles the fluent filter sublanguage to
//! parameterized, identifier-quoted SQL via `sea_query`'s dynamic builder,
//! then executes it against whichever backend the connection wraps
//! (sqlite in tests, postgres in production), reading rows back with the
//! generic sqlx introspection in [`crate::db::sqlx_row`].
//!
//! Every statement is built with `.build(...)` rather than `.to_string(...)`:
//! the former returns placeholders plus a separate `Values` list, the latter
//! inlines values as SQL literals. Only the former is safe to run against
//! user-controlled data (spec §4.2: "values are always parameterized").

use super::filter::{Direction, Filter, Op, OrderBy};
use super::sqlx_row::{pg_row_to_json, sqlite_row_to_json};
use super::DatabaseAdapter;
use crate::common::errors::CoreError;
use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, Cond, DeleteStatement, Expr, InsertStatement, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder,
    UpdateStatement, Values,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use sea_query_binder::SqlxValues;
use serde_json::{Map, Value as Json};

pub struct SeaOrmAdapter {
    pub conn: DatabaseConnection,
}

impl SeaOrmAdapter {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn fetch_json(&self, sql: &str, values: Values) -> Result<Vec<Json>, CoreError> {
        match self.conn.get_database_backend() {
            DatabaseBackend::Postgres => {
                let pool = self.conn.get_postgres_connection_pool();
                let rows = sqlx::query_with(sql, SqlxValues(values))
                    .fetch_all(pool)
                    .await
                    .map_err(|e| CoreError::Transient(e.to_string()))?;
                Ok(rows.iter().map(pg_row_to_json).collect())
            }
            DatabaseBackend::Sqlite => {
                let pool = self.conn.get_sqlite_connection_pool();
                let rows = sqlx::query_with(sql, SqlxValues(values))
                    .fetch_all(pool)
                    .await
                    .map_err(|e| CoreError::Transient(e.to_string()))?;
                Ok(rows.iter().map(sqlite_row_to_json).collect())
            }
            DatabaseBackend::MySql => Err(CoreError::Unsupported(
                "mysql is not one of the supported backends".to_string(),
            )),
        }
    }

    async fn execute(&self, sql: String, values: Values) -> Result<u64, CoreError> {
        let stmt = sea_orm::Statement::from_sql_and_values(
            self.conn.get_database_backend(),
            &sql,
            values,
        );
        let result = self.conn.execute(stmt).await.map_err(CoreError::from)?;
        Ok(result.rows_affected())
    }
}

/// Binds a JSON scalar as a typed `sea_orm::Value` rather than always as
/// text. Every row on this adapter's path started life as a typed
/// `_entities::*::Model` serialized through [`crate::db::to_row`], so a
/// `Json::String` here is frequently a UUID or an RFC3339 timestamp; binding
/// it as plain text would make Postgres reject the query outright
/// (`operator does not exist: uuid = text`) instead of matching no rows.
fn json_to_simple_expr(value: &Json) -> SimpleExpr {
    match value {
        Json::Null => Expr::value(sea_orm::Value::String(None)),
        Json::Bool(b) => Expr::value(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Expr::value(i)
            } else if let Some(f) = n.as_f64() {
                Expr::value(f)
            } else {
                Expr::value(n.to_string())
            }
        }
        Json::String(s) => {
            if let Ok(uuid) = uuid::Uuid::parse_str(s) {
                Expr::value(uuid)
            } else if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                Expr::value(dt.with_timezone(&chrono::Utc))
            } else {
                Expr::value(s.clone())
            }
        }
        other => Expr::value(other.to_string()),
    }
}

fn apply_filter(cond: Cond, filter: &Filter) -> Cond {
    let col = Expr::col(Alias::new(filter.column.clone()));
    match filter.op {
        Op::Eq if filter.value.is_null() => cond.add(col.is_null()),
        Op::Ne if filter.value.is_null() => cond.add(col.is_not_null()),
        Op::Eq => cond.add(col.eq(json_to_simple_expr(&filter.value))),
        Op::Ne => cond.add(col.ne(json_to_simple_expr(&filter.value))),
        Op::Lt => cond.add(col.lt(json_to_simple_expr(&filter.value))),
        Op::Gt => cond.add(col.gt(json_to_simple_expr(&filter.value))),
        Op::Le => cond.add(col.lte(json_to_simple_expr(&filter.value))),
        Op::Ge => cond.add(col.gte(json_to_simple_expr(&filter.value))),
        Op::Is => cond.add(col.is(json_to_simple_expr(&filter.value))),
        Op::IsNot => cond.add(col.is_not(json_to_simple_expr(&filter.value))),
        Op::Like => cond.add(col.like(filter.value.as_str().unwrap_or_default())),
        Op::ILike => {
            cond.add(Expr::expr(col).ilike(filter.value.as_str().unwrap_or_default()))
        }
        Op::In => {
            let Json::Array(items) = &filter.value else {
                return cond.add(Expr::cust("1 = 0"));
            };
            if items.is_empty() {
                // An empty IN list compiles to FALSE (spec §4.2).
                return cond.add(Expr::cust("1 = 0"));
            }
            let values: Vec<SimpleExpr> = items.iter().map(json_to_simple_expr).collect();
            cond.add(col.is_in(values.into_iter().filter_map(|e| match e {
                SimpleExpr::Value(v) => Some(v),
                _ => None,
            })))
        }
    }
}

fn build_where(filters: &[Filter]) -> Cond {
    filters.iter().fold(Cond::all(), apply_filter)
}

fn build_select(backend: DatabaseBackend, query: &SelectStatement) -> (String, Values) {
    match backend {
        DatabaseBackend::Postgres => query.build(PostgresQueryBuilder),
        DatabaseBackend::Sqlite => query.build(SqliteQueryBuilder),
        DatabaseBackend::MySql => query.build(MysqlQueryBuilder),
    }
}

fn build_insert(backend: DatabaseBackend, query: &InsertStatement) -> (String, Values) {
    match backend {
        DatabaseBackend::Postgres => query.build(PostgresQueryBuilder),
        DatabaseBackend::Sqlite => query.build(SqliteQueryBuilder),
        DatabaseBackend::MySql => query.build(MysqlQueryBuilder),
    }
}

fn build_update(backend: DatabaseBackend, query: &UpdateStatement) -> (String, Values) {
    match backend {
        DatabaseBackend::Postgres => query.build(PostgresQueryBuilder),
        DatabaseBackend::Sqlite => query.build(SqliteQueryBuilder),
        DatabaseBackend::MySql => query.build(MysqlQueryBuilder),
    }
}

fn build_delete(backend: DatabaseBackend, query: &DeleteStatement) -> (String, Values) {
    match backend {
        DatabaseBackend::Postgres => query.build(PostgresQueryBuilder),
        DatabaseBackend::Sqlite => query.build(SqliteQueryBuilder),
        DatabaseBackend::MySql => query.build(MysqlQueryBuilder),
    }
}

#[async_trait]
impl DatabaseAdapter for SeaOrmAdapter {
    async fn find_many(
        &self,
        table: &str,
        filters: &[Filter],
        order_by: &[OrderBy],
        limit: Option<u64>,
    ) -> Result<Vec<Json>, CoreError> {
        let mut query = Query::select();
        query
            .from(Alias::new(table))
            .column(sea_orm::sea_query::Asterisk)
            .cond_where(build_where(filters));
        for ob in order_by {
            let order = match ob.direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            query.order_by(Alias::new(ob.column.clone()), order);
        }
        if let Some(limit) = limit {
            query.limit(limit);
        }
        let (sql, values) = build_select(self.conn.get_database_backend(), &query);
        self.fetch_json(&sql, values).await
    }

    async fn find_one(&self, table: &str, filters: &[Filter]) -> Result<Option<Json>, CoreError> {
        Ok(self
            .find_many(table, filters, &[], Some(1))
            .await?
            .into_iter()
            .next())
    }

    /// Uses the same compiled `WHERE` as `find_many` (spec §4.2 rule).
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, CoreError> {
        let mut query = Query::select();
        query
            .from(Alias::new(table))
            .expr_as(Expr::col(sea_orm::sea_query::Asterisk).count(), Alias::new("row_count"))
            .cond_where(build_where(filters));
        let (sql, values) = build_select(self.conn.get_database_backend(), &query);
        let rows = self.fetch_json(&sql, values).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get("row_count"))
            .and_then(Json::as_u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, row: Json) -> Result<Json, CoreError> {
        let Json::Object(map) = row else {
            return Err(CoreError::Validation(
                "insert row must be an object".to_string(),
            ));
        };
        let mut query = Query::insert();
        query.into_table(Alias::new(table));
        let columns: Vec<_> = map.keys().map(|k| Alias::new(k.clone())).collect();
        let values: Vec<SimpleExpr> = map.values().map(json_to_simple_expr).collect();
        query.columns(columns);
        query.values_panic(values);
        query.returning_all();
        let (sql, values) = build_insert(self.conn.get_database_backend(), &query);
        let rows = self.fetch_json(&sql, values).await?;
        Ok(rows.into_iter().next().unwrap_or(Json::Object(Map::new())))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Json,
    ) -> Result<u64, CoreError> {
        let Json::Object(map) = patch else {
            return Err(CoreError::Validation(
                "update patch must be an object".to_string(),
            ));
        };
        let mut query = Query::update();
        query.table(Alias::new(table));
        for (k, v) in map {
            query.value(Alias::new(k), json_to_simple_expr(&v));
        }
        query.cond_where(build_where(filters));
        let (sql, values) = build_update(self.conn.get_database_backend(), &query);
        self.execute(sql, values).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, CoreError> {
        let mut query = Query::delete();
        query.from_table(Alias::new(table));
        query.cond_where(build_where(filters));
        let (sql, values) = build_delete(self.conn.get_database_backend(), &query);
        self.execute(sql, values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select_sql(filters: &[Filter]) -> String {
        let mut query = Query::select();
        query
            .from(Alias::new("photos"))
            .column(sea_orm::sea_query::Asterisk)
            .cond_where(build_where(filters));
        build_select(DatabaseBackend::Postgres, &query).0
    }

    /// Spec §4.2: identifiers are always quoted, values are always
    /// parameterized — never inlined as SQL literals.
    #[test]
    fn eq_filter_compiles_to_a_quoted_parameterized_predicate() {
        let filters = vec![Filter::new("status", Op::Eq, json!("completed"))];
        insta::assert_snapshot!(select_sql(&filters), @r#"SELECT * FROM "photos" WHERE "status" = $1"#);
    }

    /// Spec §4.2: `NULL` flips `Eq`/`Ne` to `IS`/`IS NOT` automatically.
    #[test]
    fn null_value_compiles_to_is_null_not_equals_null() {
        let filters = vec![Filter::new("deleted_at", Op::Eq, Json::Null)];
        insta::assert_snapshot!(select_sql(&filters), @r#"SELECT * FROM "photos" WHERE "deleted_at" IS NULL"#);
    }

    /// Spec §4.2: an empty `IN (...)` list compiles to `FALSE`, not to
    /// invalid or always-true SQL.
    #[test]
    fn empty_in_list_compiles_to_false() {
        let filters = vec![Filter::new("id", Op::In, json!([]))];
        insta::assert_snapshot!(select_sql(&filters), @r#"SELECT * FROM "photos" WHERE 1 = 0"#);
    }
}
