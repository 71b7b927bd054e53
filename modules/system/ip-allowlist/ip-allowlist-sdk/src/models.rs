use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted allow-list row.
///
/// `ip_address` holds an IP literal, an IPv4 CIDR block (`10.0.0.0/8`) or the
/// alias `localhost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    pub id: i64,
    pub ip_address: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for a new entry. Timestamps and id are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllowListEntry {
    pub ip_address: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListEntryPatch {
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl AllowListEntryPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.is_active.is_none()
    }
}
