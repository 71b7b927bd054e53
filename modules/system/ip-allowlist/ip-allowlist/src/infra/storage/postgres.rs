use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ip_allowlist_sdk::{
    AllowListEntry, AllowListEntryPatch, AllowListError, AllowListStore, NewAllowListEntry,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{EntryRow, insert_error, storage_error};
use crate::config::StoreConfig;

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS ip_allowlist (
    id          BIGSERIAL PRIMARY KEY,
    ip_address  TEXT NOT NULL UNIQUE,
    description TEXT,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    created_by  TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

pub struct PostgresAllowListStore {
    pool: PgPool,
}

impl PostgresAllowListStore {
    /// # Errors
    ///
    /// Returns the driver error if the pool cannot be opened.
    pub async fn connect(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(config.dsn())
            .await?;
        Ok(Self::from_pool(pool))
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// `Unavailable` if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), AllowListError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl AllowListStore for PostgresAllowListStore {
    async fn fetch_active_entries(&self) -> Result<Vec<String>, AllowListError> {
        sqlx::query_scalar("SELECT ip_address FROM ip_allowlist WHERE is_active = TRUE ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn list_entries(&self) -> Result<Vec<AllowListEntry>, AllowListError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            "SELECT id, ip_address, description, is_active, created_by, created_at, updated_at \
             FROM ip_allowlist ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(rows.into_iter().map(AllowListEntry::from).collect())
    }

    async fn insert_entry(
        &self,
        entry: NewAllowListEntry,
    ) -> Result<AllowListEntry, AllowListError> {
        let now = Utc::now();
        let row: EntryRow = sqlx::query_as(
            "INSERT INTO ip_allowlist \
             (ip_address, description, is_active, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING id, ip_address, description, is_active, created_by, created_at, updated_at",
        )
        .bind(&entry.ip_address)
        .bind(&entry.description)
        .bind(entry.is_active)
        .bind(&entry.created_by)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, &entry.ip_address))?;
        Ok(row.into())
    }

    async fn update_entry(
        &self,
        id: i64,
        patch: AllowListEntryPatch,
    ) -> Result<AllowListEntry, AllowListError> {
        let row: Option<EntryRow> = sqlx::query_as(
            "UPDATE ip_allowlist SET \
             description = COALESCE($1, description), \
             is_active = COALESCE($2, is_active), \
             updated_at = $3 \
             WHERE id = $4 \
             RETURNING id, ip_address, description, is_active, created_by, created_at, updated_at",
        )
        .bind(&patch.description)
        .bind(patch.is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(AllowListEntry::from)
            .ok_or(AllowListError::NotFound { id })
    }

    async fn delete_entry(&self, id: i64) -> Result<(), AllowListError> {
        let result = sqlx::query("DELETE FROM ip_allowlist WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(AllowListError::NotFound { id });
        }
        Ok(())
    }
}
