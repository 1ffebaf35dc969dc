//! Account and refresh-token records plus the single-table key layout.
//!
//! Every row lives in one table addressed by `(pk, sk)`:
//!
//! | record        | pk                        | sk        |
//! |---------------|---------------------------|-----------|
//! | user          | `USER#<phone>`            | `INFO`    |
//! | admin         | `ADMIN#<username>`        | `INFO`    |
//! | refresh token | `REFRESH_TOKEN#<owner>`   | `<token>` |
//!
//! Refresh tokens use the token value as sort key so an owner can hold more
//! than one row mid-rotation, while `delete_all_by_owner` stays a single
//! prefix delete.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;
use uuid::Uuid;

pub const USER_PREFIX: &str = "USER#";
pub const ADMIN_PREFIX: &str = "ADMIN#";
pub const REFRESH_TOKEN_PREFIX: &str = "REFRESH_TOKEN#";
pub const INFO_SK: &str = "INFO";

#[must_use]
pub fn user_pk(phone: &str) -> String {
    format!("{USER_PREFIX}{phone}")
}

#[must_use]
pub fn admin_pk(username: &str) -> String {
    format!("{ADMIN_PREFIX}{username}")
}

#[must_use]
pub fn refresh_token_pk(owner_id: &str) -> String {
    format!("{REFRESH_TOKEN_PREFIX}{owner_id}")
}

/// Wall-clock now as epoch seconds.
#[must_use]
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub phone: String,
    pub password_hash: String,
    pub name: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Build a new active user with a generated id and fresh timestamps.
    #[must_use]
    pub fn new(phone: String, password_hash: String, name: String) -> Self {
        let now = now_epoch_seconds();
        Self {
            user_id: Uuid::new_v4().to_string(),
            phone,
            password_hash,
            name,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Admin {
    pub admin_id: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub role: AdminRole,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Admin {
    #[must_use]
    pub fn new(username: String, password_hash: String, name: String, role: AdminRole) -> Self {
        let now = now_epoch_seconds();
        Self {
            admin_id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            name,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One persisted refresh token. Expiry is epoch seconds, taken from the
/// token's own `exp` claim at save time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub owner_id: String,
    pub token: String,
    pub created_at: i64,
    pub expires_at: i64,
}
