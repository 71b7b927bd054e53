//! The per-request allow-list decision.

use std::sync::Arc;

use authn_gateway_sdk::{AccessDecision, AccessTier};

use super::cache::AllowListCache;
use super::log_aggregation::{AllowLog, AllowLogAggregator};
use super::matcher;

/// `BypassCheck -> CacheCheck -> Match -> Allow | Deny`
///
/// Independent of caller identity. Store failures surface as an empty list
/// from the cache, so the gate fails closed.
pub struct IpAllowListGate {
    enabled: bool,
    bypass_paths: Vec<String>,
    cache: Arc<AllowListCache>,
    logs: Arc<AllowLogAggregator>,
}

impl IpAllowListGate {
    #[must_use]
    pub fn new(
        enabled: bool,
        bypass_paths: Vec<String>,
        cache: Arc<AllowListCache>,
        logs: Arc<AllowLogAggregator>,
    ) -> Self {
        Self {
            enabled,
            bypass_paths,
            cache,
            logs,
        }
    }

    /// Decide for a request on `path` from `client_ip` (already normalized).
    pub async fn evaluate(&self, path: &str, client_ip: &str) -> AccessDecision {
        if !self.enabled {
            return AccessDecision::allow(AccessTier::IpAllowList, "allow-list disabled");
        }
        if self.is_bypassed(path) {
            tracing::trace!(path, "allow-list bypass");
            return AccessDecision::allow(AccessTier::IpAllowList, "bypass path");
        }

        let snapshot = self.cache.entries().await;
        if matcher::is_allowed(snapshot.entries(), client_ip) {
            self.log_allow(client_ip, path);
            AccessDecision::allow(AccessTier::IpAllowList, "client address is allow-listed")
        } else {
            tracing::warn!(
                client_ip,
                path,
                entries = snapshot.entries().len(),
                "request denied by IP allow-list"
            );
            AccessDecision::deny(AccessTier::IpAllowList, "Access denied: IP address not allowed")
        }
    }

    /// Exact match or a sub-path of a bypass path.
    #[must_use]
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|bypass| {
            path.strip_prefix(bypass.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    fn log_allow(&self, client_ip: &str, path: &str) {
        match self.logs.record(client_ip) {
            AllowLog::Emit { suppressed: 0 } => {
                tracing::info!(client_ip, path, "request allowed by IP allow-list");
            }
            AllowLog::Emit { suppressed } => {
                tracing::info!(
                    client_ip,
                    path,
                    suppressed,
                    "request allowed by IP allow-list ({suppressed} more since last report)"
                );
            }
            AllowLog::Suppressed => {}
        }
    }
}
