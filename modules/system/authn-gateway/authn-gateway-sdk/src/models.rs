//! Access decision models shared by the identity guards and the IP gate.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
}

/// The policy tier that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    Authenticated,
    AllowedGroup,
    AdminOnly,
    IpAllowList,
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticated => "authenticated",
            Self::AllowedGroup => "allowed_group",
            Self::AdminOnly => "admin_only",
            Self::IpAllowList => "ip_allow_list",
        };
        f.write_str(name)
    }
}

/// Outcome of one guard evaluation. Used for response shaping and logging only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub outcome: Outcome,
    pub tier: AccessTier,
    pub reason: String,
}

impl AccessDecision {
    #[must_use]
    pub fn allow(tier: AccessTier, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Allow,
            tier,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn deny(tier: AccessTier, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Deny,
            tier,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}
