pub use super::_entities::users::{ActiveModel, Column, Entity, Model};
use crate::common::errors::CoreError;
use crate::db::filter::{Filter, Op};
use crate::db::{from_row, DatabaseAdapter};
use chrono::Utc;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::RngCore;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde_json::json;
use sha2::Sha512;
use uuid::Uuid;

const TABLE: &str = "users";
const PBKDF2_ITERATIONS: u32 = 100_000;
const PBKDF2_KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert && self.updated_at.is_unchanged() {
            let mut this = self;
            this.updated_at = Set(Utc::now().into());
            Ok(this)
        } else {
            Ok(self)
        }
    }
}

pub const ROLE_ADMIN: &str = "admin";

/// Salt:iterations:hash, `:`-joined, per the bootstrap admin-seed contract.
#[must_use]
pub fn hash_password(plain: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(plain, &salt, PBKDF2_ITERATIONS);
    format!(
        "{}:{}:{}",
        hex::encode(salt),
        PBKDF2_ITERATIONS,
        hex::encode(digest)
    )
}

#[must_use]
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, ':');
    let (Some(salt_hex), Some(iter_str), Some(hash_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(iterations) = iter_str.parse::<u32>() else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };
    let actual = derive(plain, &salt, iterations);
    crate::common::constant_time_eq(&actual, &expected)
}

fn derive(plain: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut out = vec![0u8; PBKDF2_KEY_LEN];
    pbkdf2::<Hmac<Sha512>>(plain.as_bytes(), salt, iterations, &mut out);
    out
}

pub async fn find_by_email(db: &dyn DatabaseAdapter, email: &str) -> Result<Option<Model>, CoreError> {
    let filters = vec![
        Filter::new("email", Op::Eq, json!(email.to_lowercase())),
        Filter::new("deleted_at", Op::Eq, serde_json::Value::Null),
    ];
    match db.find_one(TABLE, &filters).await? {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}

async fn count_active_admins(db: &dyn DatabaseAdapter) -> Result<u64, CoreError> {
    let filters = vec![
        Filter::new("role", Op::Eq, json!(ROLE_ADMIN)),
        Filter::new("is_active", Op::Eq, json!(true)),
        Filter::new("deleted_at", Op::Eq, serde_json::Value::Null),
    ];
    db.count(TABLE, &filters).await
}

/// Idempotent admin-seed (spec §4.8): creates the admin by email if absent,
/// otherwise rotates its `password_hash` in place. Never produces a second
/// active admin and never demotes the existing one.
pub async fn seed_admin(
    db: &dyn DatabaseAdapter,
    email: &str,
    plain_password: &str,
) -> Result<Model, CoreError> {
    let email = email.to_lowercase();
    if let Some(existing) = find_by_email(db, &email).await? {
        let patch = json!({
            "password_hash": hash_password(plain_password),
            "role": ROLE_ADMIN,
            "is_active": true,
        });
        db.update(TABLE, &[Filter::new("id", Op::Eq, json!(existing.id))], patch)
            .await?;
        return find_required(db, existing.id).await;
    }

    let id = Uuid::new_v4();
    let row = json!({
        "id": id,
        "email": email,
        "password_hash": hash_password(plain_password),
        "role": ROLE_ADMIN,
        "is_active": true,
    });
    db.insert(TABLE, row).await?;
    find_required(db, id).await
}

async fn find_required(db: &dyn DatabaseAdapter, user_id: Uuid) -> Result<Model, CoreError> {
    let filters = vec![Filter::new("id", Op::Eq, json!(user_id))];
    let row = db
        .find_one(TABLE, &filters)
        .await?
        .ok_or_else(|| CoreError::NotFound("user".to_string()))?;
    from_row(row)
}

/// Guards the "exactly one active admin" invariant (spec §4.1) at the point
/// of mutation: deactivating, demoting, or soft-deleting the last active
/// admin is rejected rather than silently leaving zero.
pub async fn guard_last_admin_mutation(
    db: &dyn DatabaseAdapter,
    target: &Model,
    would_remain_admin: bool,
) -> Result<(), CoreError> {
    if would_remain_admin || target.role != ROLE_ADMIN || !target.is_active {
        return Ok(());
    }
    let active_admins = count_active_admins(db).await?;
    if active_admins <= 1 {
        return Err(CoreError::Conflict(
            "cannot remove the last active admin".to_string(),
        ));
    }
    Ok(())
}

pub async fn deactivate(db: &dyn DatabaseAdapter, user_id: Uuid) -> Result<Model, CoreError> {
    let existing = find_required(db, user_id).await?;
    guard_last_admin_mutation(db, &existing, false).await?;
    let patch = json!({ "is_active": false });
    db.update(TABLE, &[Filter::new("id", Op::Eq, json!(user_id))], patch)
        .await?;
    find_required(db, user_id).await
}
