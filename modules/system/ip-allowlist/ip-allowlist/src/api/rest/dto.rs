use chrono::{DateTime, Utc};
use ip_allowlist_sdk::{AllowListEntry, AllowListEntryPatch};
use serde::{Deserialize, Serialize};

use crate::domain::AddEntry;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowListEntryDto {
    pub id: i64,
    pub ip_address: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AllowListEntry> for AllowListEntryDto {
    fn from(e: AllowListEntry) -> Self {
        Self {
            id: e.id,
            ip_address: e.ip_address,
            description: e.description,
            is_active: e.is_active,
            created_by: e.created_by,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAllowListEntryRequest {
    pub ip_address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CreateAllowListEntryRequest> for AddEntry {
    fn from(req: CreateAllowListEntryRequest) -> Self {
        Self {
            ip_address: req.ip_address,
            description: req.description,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAllowListEntryRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<UpdateAllowListEntryRequest> for AllowListEntryPatch {
    fn from(req: UpdateAllowListEntryRequest) -> Self {
        Self {
            description: req.description,
            is_active: req.is_active,
        }
    }
}
