//! Allow-list management: validated CRUD with cache invalidation.

use std::sync::Arc;

use ip_allowlist_sdk::{
    AllowListEntry, AllowListEntryPatch, AllowListError, AllowListStore, NewAllowListEntry,
};

use super::cache::AllowListCache;
use super::matcher;

const MAX_DESCRIPTION_LEN: usize = 255;

/// Input for a new entry as received from an administrator.
#[derive(Debug, Clone)]
pub struct AddEntry {
    pub ip_address: String,
    pub description: Option<String>,
    pub is_active: bool,
}

pub struct AllowListService {
    store: Arc<dyn AllowListStore>,
    cache: Arc<AllowListCache>,
}

impl AllowListService {
    #[must_use]
    pub fn new(store: Arc<dyn AllowListStore>, cache: Arc<AllowListCache>) -> Self {
        Self { store, cache }
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self) -> Result<Vec<AllowListEntry>, AllowListError> {
        self.store.list_entries().await
    }

    /// # Errors
    ///
    /// `Validation` for an unusable address or description, `Conflict` for a
    /// duplicate address, or a store failure.
    pub async fn add(
        &self,
        input: AddEntry,
        created_by: Option<String>,
    ) -> Result<AllowListEntry, AllowListError> {
        matcher::validate_entry(&input.ip_address)
            .map_err(|msg| AllowListError::validation("ip_address", msg))?;
        let ip_address = matcher::canonical_entry(&input.ip_address);
        let description = normalize_description(input.description)?;

        let entry = self
            .store
            .insert_entry(NewAllowListEntry {
                ip_address,
                description,
                is_active: input.is_active,
                created_by,
            })
            .await?;

        self.cache.invalidate();
        tracing::info!(
            id = entry.id,
            ip_address = %entry.ip_address,
            created_by = entry.created_by.as_deref().unwrap_or("-"),
            "allow-list entry added"
        );
        Ok(entry)
    }

    /// # Errors
    ///
    /// `Validation` for an empty patch or bad description, `NotFound` for an
    /// unknown id, or a store failure.
    pub async fn update(
        &self,
        id: i64,
        patch: AllowListEntryPatch,
    ) -> Result<AllowListEntry, AllowListError> {
        if patch.is_empty() {
            return Err(AllowListError::validation(
                "body",
                "at least one of description, is_active is required",
            ));
        }
        let patch = AllowListEntryPatch {
            description: normalize_description(patch.description)?,
            is_active: patch.is_active,
        };

        let entry = self.store.update_entry(id, patch).await?;

        self.cache.invalidate();
        tracing::info!(id, is_active = entry.is_active, "allow-list entry updated");
        Ok(entry)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id, or a store failure.
    pub async fn remove(&self, id: i64) -> Result<(), AllowListError> {
        self.store.delete_entry(id).await?;

        self.cache.invalidate();
        tracing::info!(id, "allow-list entry removed");
        Ok(())
    }
}

fn normalize_description(description: Option<String>) -> Result<Option<String>, AllowListError> {
    let description = description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());
    if let Some(d) = &description
        && d.chars().count() > MAX_DESCRIPTION_LEN
    {
        return Err(AllowListError::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(description)
}
