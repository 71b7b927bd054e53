//! sqlx-backed [`AllowListStore`] implementations, one per dialect.
//!
//! The dialect is picked once from the DSN scheme; nothing above this module
//! knows which database is in use.

pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ip_allowlist_sdk::{AllowListEntry, AllowListError, AllowListStore};

use crate::config::StoreConfig;

pub use postgres::PostgresAllowListStore;
pub use sqlite::SqliteAllowListStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    #[must_use]
    pub fn from_dsn(dsn: &str) -> Option<Self> {
        let scheme = dsn.split_once(':')?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Open the configured store and, if requested, create its table.
///
/// # Errors
///
/// `Validation` for an unsupported DSN scheme, `Unavailable` when the
/// database cannot be reached or the schema cannot be created.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn AllowListStore>, AllowListError> {
    let dialect = Dialect::from_dsn(config.dsn()).ok_or_else(|| {
        AllowListError::validation(
            "store.dsn",
            "expected a postgres://, postgresql:// or sqlite: DSN",
        )
    })?;

    let store: Arc<dyn AllowListStore> = match dialect {
        Dialect::Postgres => {
            let store = PostgresAllowListStore::connect(config)
                .await
                .map_err(storage_error)?;
            if config.ensure_schema {
                store.ensure_schema().await?;
            }
            Arc::new(store)
        }
        Dialect::Sqlite => {
            let store = SqliteAllowListStore::connect(config)
                .await
                .map_err(storage_error)?;
            if config.ensure_schema {
                store.ensure_schema().await?;
            }
            Arc::new(store)
        }
    };

    tracing::info!(dialect = ?dialect, "allow-list store connected");
    Ok(store)
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    id: i64,
    ip_address: String,
    description: Option<String>,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EntryRow> for AllowListEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            ip_address: row.ip_address,
            description: row.description,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Map a driver error. Detail goes to logs; callers only see the kind.
pub(crate) fn storage_error(e: sqlx::Error) -> AllowListError {
    AllowListError::unavailable(e.to_string())
}

pub(crate) fn insert_error(e: sqlx::Error, ip_address: &str) -> AllowListError {
    let duplicate = e
        .as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
    if duplicate {
        AllowListError::Conflict {
            ip_address: ip_address.to_owned(),
        }
    } else {
        storage_error(e)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn dialect_follows_the_dsn_scheme() {
        assert_eq!(
            Dialect::from_dsn("postgres://u@h/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_dsn("PostgreSQL://u@h/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(Dialect::from_dsn("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(
            Dialect::from_dsn("sqlite://portal.db?mode=rwc"),
            Some(Dialect::Sqlite)
        );
        assert_eq!(Dialect::from_dsn("mysql://u@h/db"), None);
        assert_eq!(Dialect::from_dsn("portal.db"), None);
    }
}
