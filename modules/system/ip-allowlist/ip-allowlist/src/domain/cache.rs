//! Time-bounded snapshot of the active allow-list entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, Utc};
use ip_allowlist_sdk::AllowListStore;
use portal_security::Clock;

/// Active entries as of `fetched_at`. Never modified after creation.
#[derive(Debug)]
pub struct Snapshot {
    entries: Vec<String>,
    fetched_at: DateTime<Utc>,
    generation: u64,
}

impl Snapshot {
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Lazily populated, TTL-bounded cache in front of the [`AllowListStore`].
///
/// The snapshot is replaced wholesale. Concurrent refreshes after expiry may
/// both hit the store; the last one to finish wins, which is harmless because
/// both read the same table.
///
/// Every snapshot is stamped with the invalidation generation current when its
/// fetch started. A snapshot from an older generation is never served, so a
/// fetch that was in flight during [`AllowListCache::invalidate`] cannot bring
/// back the pre-mutation list.
///
/// A failed fetch yields an empty snapshot for the current caller only. It is
/// not stored, so the next request retries the store.
pub struct AllowListCache {
    store: Arc<dyn AllowListStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    snapshot: ArcSwapOption<Snapshot>,
    generation: AtomicU64,
}

impl AllowListCache {
    #[must_use]
    pub fn new(store: Arc<dyn AllowListStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            snapshot: ArcSwapOption::from(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Current entries, refetching when the snapshot is missing or expired.
    pub async fn entries(&self) -> Arc<Snapshot> {
        let now = self.clock.now();
        if let Some(snapshot) = self.snapshot.load_full()
            && snapshot.generation == self.generation.load(Ordering::Acquire)
            && now - snapshot.fetched_at < self.ttl
        {
            return snapshot;
        }
        self.refresh(now).await
    }

    /// Drop the snapshot so the next read goes to the store.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.snapshot.store(None);
        tracing::debug!("allow-list cache invalidated");
    }

    async fn refresh(&self, now: DateTime<Utc>) -> Arc<Snapshot> {
        let generation = self.generation.load(Ordering::Acquire);
        match self.store.fetch_active_entries().await {
            Ok(entries) => {
                let snapshot = Arc::new(Snapshot {
                    entries,
                    fetched_at: now,
                    generation,
                });
                if self.generation.load(Ordering::Acquire) == generation {
                    tracing::debug!(count = snapshot.entries.len(), "allow-list snapshot refreshed");
                    self.snapshot.store(Some(snapshot.clone()));
                } else {
                    tracing::debug!("allow-list changed during fetch, snapshot discarded");
                }
                snapshot
            }
            Err(e) => {
                tracing::error!(error = %e, "allow-list fetch failed, denying non-bypassed traffic");
                Arc::new(Snapshot {
                    entries: Vec::new(),
                    fetched_at: now,
                    generation,
                })
            }
        }
    }
}
