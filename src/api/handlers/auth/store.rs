//! Credential and token persistence over the single-table layout.
//!
//! The stores only persist what they are told; when to create, rotate, or
//! delete a refresh record is the orchestrator's decision. Both traits are
//! backed by one Postgres table, see [`super::entity`] for the key layout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::entity::{
    admin_pk, now_epoch_seconds, refresh_token_pk, user_pk, Admin, RefreshTokenRecord, User,
    INFO_SK,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Account persistence. Saves are upserts; the update timestamp is always
/// refreshed, ids and creation timestamps come from the entity constructors.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>>;
    async fn user_exists(&self, phone: &str) -> Result<bool>;
    async fn save_user(&self, user: User) -> Result<User>;
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>>;
    async fn count_users(&self) -> Result<i64>;

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>>;
    async fn admin_exists(&self, username: &str) -> Result<bool>;
    async fn save_admin(&self, admin: Admin) -> Result<Admin>;
}

/// Refresh-token persistence with lookup by owner and by token value.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, record: RefreshTokenRecord) -> Result<()>;
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<RefreshTokenRecord>>;
    async fn delete_all_by_owner(&self, owner_id: &str) -> Result<()>;
    async fn find_by_token_value(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;
    async fn delete(&self, record: &RefreshTokenRecord) -> Result<()>;
    async fn delete_by_token_value(&self, token: &str) -> Result<()>;
}

/// Create the table and token index if they do not exist yet.
pub async fn bootstrap(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .context("failed to bootstrap auth_items table")?;
    Ok(())
}

pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_item<T: serde::de::DeserializeOwned>(
        &self,
        pk: &str,
        sk: &str,
    ) -> Result<Option<T>> {
        let query = "SELECT attributes FROM auth_items WHERE pk = $1 AND sk = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(pk)
            .bind(sk)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch item")?;

        row.map(|row| {
            let attributes: serde_json::Value = row.get("attributes");
            serde_json::from_value(attributes).context("failed to decode item attributes")
        })
        .transpose()
    }

    async fn item_exists(&self, pk: &str, sk: &str) -> Result<bool> {
        let query = "SELECT 1 FROM auth_items WHERE pk = $1 AND sk = $2 LIMIT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(pk)
            .bind(sk)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to check item existence")?;
        Ok(row.is_some())
    }

    async fn upsert_item(
        &self,
        pk: &str,
        sk: &str,
        attributes: &serde_json::Value,
        token: Option<&str>,
    ) -> Result<()> {
        let query = r"
            INSERT INTO auth_items (pk, sk, attributes, token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (pk, sk) DO UPDATE
            SET attributes = EXCLUDED.attributes,
                token = EXCLUDED.token,
                updated_at = NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(pk)
            .bind(sk)
            .bind(attributes)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert item")?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgAuthStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_item(&user_pk(phone), INFO_SK).await
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let query = "SELECT attributes FROM auth_items \
                     WHERE pk LIKE 'USER#%' AND sk = $1 AND attributes->>'user_id' = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(INFO_SK)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch user by id")?;

        row.map(|row| {
            let attributes: serde_json::Value = row.get("attributes");
            serde_json::from_value(attributes).context("failed to decode user attributes")
        })
        .transpose()
    }

    async fn user_exists(&self, phone: &str) -> Result<bool> {
        self.item_exists(&user_pk(phone), INFO_SK).await
    }

    async fn save_user(&self, mut user: User) -> Result<User> {
        user.updated_at = now_epoch_seconds();
        let attributes =
            serde_json::to_value(&user).context("failed to serialize user attributes")?;
        self.upsert_item(&user_pk(&user.phone), INFO_SK, &attributes, None)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let query = "SELECT attributes FROM auth_items \
                     WHERE pk LIKE 'USER#%' AND sk = $1 \
                     ORDER BY pk LIMIT $2 OFFSET $3";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(INFO_SK)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list users")?;

        rows.into_iter()
            .map(|row| {
                let attributes: serde_json::Value = row.get("attributes");
                serde_json::from_value(attributes).context("failed to decode user attributes")
            })
            .collect()
    }

    async fn count_users(&self) -> Result<i64> {
        let query = "SELECT COUNT(*) AS total FROM auth_items WHERE pk LIKE 'USER#%' AND sk = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(INFO_SK)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to count users")?;
        Ok(row.get("total"))
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        self.find_item(&admin_pk(username), INFO_SK).await
    }

    async fn admin_exists(&self, username: &str) -> Result<bool> {
        self.item_exists(&admin_pk(username), INFO_SK).await
    }

    async fn save_admin(&self, mut admin: Admin) -> Result<Admin> {
        admin.updated_at = now_epoch_seconds();
        let attributes =
            serde_json::to_value(&admin).context("failed to serialize admin attributes")?;
        self.upsert_item(&admin_pk(&admin.username), INFO_SK, &attributes, None)
            .await?;
        Ok(admin)
    }
}

#[async_trait]
impl TokenStore for PgAuthStore {
    async fn save(&self, record: RefreshTokenRecord) -> Result<()> {
        let attributes =
            serde_json::to_value(&record).context("failed to serialize refresh record")?;
        self.upsert_item(
            &refresh_token_pk(&record.owner_id),
            &record.token,
            &attributes,
            Some(&record.token),
        )
        .await
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<RefreshTokenRecord>> {
        let query = "SELECT attributes FROM auth_items WHERE pk = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(refresh_token_pk(owner_id))
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch refresh records by owner")?;

        rows.into_iter()
            .map(|row| {
                let attributes: serde_json::Value = row.get("attributes");
                serde_json::from_value(attributes).context("failed to decode refresh record")
            })
            .collect()
    }

    async fn delete_all_by_owner(&self, owner_id: &str) -> Result<()> {
        let query = "DELETE FROM auth_items WHERE pk = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(refresh_token_pk(owner_id))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh records by owner")?;
        Ok(())
    }

    async fn find_by_token_value(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        // Indexed reverse lookup; the caller does not know the owner yet.
        let query = "SELECT attributes FROM auth_items WHERE token = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch refresh record by token")?;

        row.map(|row| {
            let attributes: serde_json::Value = row.get("attributes");
            serde_json::from_value(attributes).context("failed to decode refresh record")
        })
        .transpose()
    }

    async fn delete(&self, record: &RefreshTokenRecord) -> Result<()> {
        // Keyed delete for when the full record is already in hand.
        let query = "DELETE FROM auth_items WHERE pk = $1 AND sk = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(refresh_token_pk(&record.owner_id))
            .bind(&record.token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh record")?;
        Ok(())
    }

    async fn delete_by_token_value(&self, token: &str) -> Result<()> {
        // Deleting an already-gone token is a no-op, not an error.
        let query = "DELETE FROM auth_items WHERE token = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh record by token")?;
        Ok(())
    }
}
