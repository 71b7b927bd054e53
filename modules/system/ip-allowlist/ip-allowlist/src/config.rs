//! Configuration for the IP allow-list gate.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_bypass_paths() -> Vec<String> {
    vec!["/health".to_owned(), "/login/callback".to_owned()]
}

fn default_api_prefix() -> String {
    "/api".to_owned()
}

fn default_log_window_secs() -> u64 {
    60
}

fn default_log_retention_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_dsn() -> SecretString {
    SecretString::from("sqlite://portal.db?mode=rwc".to_owned())
}

fn deserialize_dsn<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_ms() -> u64 {
    3_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IpAllowListConfig {
    /// When false every request passes the gate.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum age of the cached allow-list snapshot.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Paths (and their sub-paths) that are never filtered.
    #[serde(default = "default_bypass_paths")]
    pub bypass_paths: Vec<String>,

    /// Denied requests under this prefix get a JSON body, others an HTML page.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Take the client address from the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,

    /// Repeated allows from one client inside this window share one log line.
    #[serde(default = "default_log_window_secs")]
    pub log_window_secs: u64,

    /// Idle aggregation entries older than this are swept.
    #[serde(default = "default_log_retention_secs")]
    pub log_retention_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    pub store: StoreConfig,
}

impl Default for IpAllowListConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            bypass_paths: default_bypass_paths(),
            api_prefix: default_api_prefix(),
            trust_forwarded_for: false,
            log_window_secs: default_log_window_secs(),
            log_retention_secs: default_log_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            store: StoreConfig::default(),
        }
    }
}

/// Allow-list database. The dialect is chosen from the DSN scheme.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// `postgres://...`, `postgresql://...` or `sqlite:...`
    ///
    /// May embed a password, so it is redacted from `Debug` output.
    #[serde(default = "default_dsn", deserialize_with = "deserialize_dsn")]
    pub dsn: SecretString,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound for waiting on a pooled connection.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Create the table on startup if it does not exist.
    #[serde(default = "default_true")]
    pub ensure_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            ensure_schema: true,
        }
    }
}

impl StoreConfig {
    /// Defaults with the given DSN.
    #[must_use]
    pub fn with_dsn(dsn: impl Into<String>) -> Self {
        Self {
            dsn: SecretString::from(dsn.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        self.dsn.expose_secret()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: IpAllowListConfig = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(cfg.enabled);
        assert!(!cfg.trust_forwarded_for);
        assert_eq!(cfg.cache_ttl_secs, 300);
        assert_eq!(cfg.bypass_paths, vec!["/health", "/login/callback"]);
        assert_eq!(cfg.api_prefix, "/api");
        assert_eq!(cfg.log_window_secs, 60);
        assert_eq!(cfg.log_retention_secs, 600);
        assert_eq!(cfg.store.max_connections, 5);
        assert!(cfg.store.ensure_schema);
    }

    #[test]
    fn partial_store_section_keeps_other_defaults() {
        let cfg: IpAllowListConfig = serde_json::from_value(serde_json::json!({
            "cache_ttl_secs": 30,
            "store": { "dsn": "postgres://portal@db/portal" }
        }))
        .unwrap();

        assert_eq!(cfg.cache_ttl_secs, 30);
        assert_eq!(cfg.store.dsn(), "postgres://portal@db/portal");
        assert_eq!(cfg.store.acquire_timeout_ms, 3_000);
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn dsn_password_is_not_in_debug_output() {
        let cfg: IpAllowListConfig = serde_json::from_value(serde_json::json!({
            "store": { "dsn": "postgres://portal:hunter2@db/portal" }
        }))
        .unwrap();

        let dumped = format!("{cfg:#?}");

        assert!(!dumped.contains("hunter2"));
        assert!(dumped.contains("REDACTED"));
        assert_eq!(cfg.store.dsn(), "postgres://portal:hunter2@db/portal");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<IpAllowListConfig, _> =
            serde_json::from_value(serde_json::json!({ "ttl": 5 }));
        assert!(result.is_err());
    }
}
