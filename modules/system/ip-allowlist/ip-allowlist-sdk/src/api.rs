//! Persistence port for allow-list entries.

use async_trait::async_trait;

use crate::error::AllowListError;
use crate::models::{AllowListEntry, AllowListEntryPatch, NewAllowListEntry};

/// Storage for allow-list entries, one implementation per database dialect.
///
/// The gate only needs [`fetch_active_entries`](Self::fetch_active_entries);
/// the remaining operations back the management endpoints.
#[async_trait]
pub trait AllowListStore: Send + Sync {
    /// `ip_address` of every active entry, ordered by id.
    ///
    /// # Errors
    ///
    /// [`AllowListError::Unavailable`] if the backend cannot be queried.
    async fn fetch_active_entries(&self) -> Result<Vec<String>, AllowListError>;

    /// All entries, active or not, ordered by id.
    ///
    /// # Errors
    ///
    /// [`AllowListError::Unavailable`] if the backend cannot be queried.
    async fn list_entries(&self) -> Result<Vec<AllowListEntry>, AllowListError>;

    /// # Errors
    ///
    /// [`AllowListError::Conflict`] if the address is already listed,
    /// [`AllowListError::Unavailable`] on backend failure.
    async fn insert_entry(&self, entry: NewAllowListEntry)
    -> Result<AllowListEntry, AllowListError>;

    /// # Errors
    ///
    /// [`AllowListError::NotFound`] if no entry has `id`,
    /// [`AllowListError::Unavailable`] on backend failure.
    async fn update_entry(
        &self,
        id: i64,
        patch: AllowListEntryPatch,
    ) -> Result<AllowListEntry, AllowListError>;

    /// # Errors
    ///
    /// [`AllowListError::NotFound`] if no entry has `id`,
    /// [`AllowListError::Unavailable`] on backend failure.
    async fn delete_entry(&self, id: i64) -> Result<(), AllowListError>;
}
