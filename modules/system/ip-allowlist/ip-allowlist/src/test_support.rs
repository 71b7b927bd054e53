//! In-memory store for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use ip_allowlist_sdk::{
    AllowListEntry, AllowListEntryPatch, AllowListError, AllowListStore, NewAllowListEntry,
};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<AllowListEntry>>,
    next_id: AtomicUsize,
    pub fetches: AtomicUsize,
    pub fail: AtomicBool,
    /// Signalled once a held fetch has read the rows.
    pub fetch_started: Notify,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MemoryStore {
    pub fn with_entries(entries: &[&str]) -> Self {
        let store = Self::default();
        store.replace(entries);
        store
    }

    /// Swap the table contents for active entries with the given addresses.
    pub fn replace(&self, entries: &[&str]) {
        let rows = entries
            .iter()
            .map(|ip| self.row((*ip).to_owned(), true))
            .collect();
        *self.rows.lock() = rows;
    }

    /// Make the next fetch read the rows, then wait for the returned sender.
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock() = Some(rx);
        tx
    }

    fn row(&self, ip_address: String, is_active: bool) -> AllowListEntry {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        AllowListEntry {
            id: i64::try_from(id).unwrap(),
            ip_address,
            description: None,
            is_active,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn check(&self) -> Result<(), AllowListError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AllowListError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl AllowListStore for MemoryStore {
    async fn fetch_active_entries(&self) -> Result<Vec<String>, AllowListError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let active: Vec<String> = self
            .rows
            .lock()
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.ip_address.clone())
            .collect();

        let hold = self.hold.lock().take();
        if let Some(release) = hold {
            self.fetch_started.notify_one();
            let _ = release.await;
        }
        Ok(active)
    }

    async fn list_entries(&self) -> Result<Vec<AllowListEntry>, AllowListError> {
        self.check()?;
        Ok(self.rows.lock().clone())
    }

    async fn insert_entry(
        &self,
        entry: NewAllowListEntry,
    ) -> Result<AllowListEntry, AllowListError> {
        self.check()?;
        if self
            .rows
            .lock()
            .iter()
            .any(|r| r.ip_address == entry.ip_address)
        {
            return Err(AllowListError::Conflict {
                ip_address: entry.ip_address,
            });
        }
        let mut row = self.row(entry.ip_address, entry.is_active);
        row.description = entry.description;
        row.created_by = entry.created_by;
        self.rows.lock().push(row.clone());
        Ok(row)
    }

    async fn update_entry(
        &self,
        id: i64,
        patch: AllowListEntryPatch,
    ) -> Result<AllowListEntry, AllowListError> {
        self.check()?;
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AllowListError::NotFound { id })?;
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        if let Some(is_active) = patch.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_entry(&self, id: i64) -> Result<(), AllowListError> {
        self.check()?;
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(AllowListError::NotFound { id });
        }
        Ok(())
    }
}
