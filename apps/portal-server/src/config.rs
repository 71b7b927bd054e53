//! Application configuration: YAML file overlaid by `PORTAL__` environment variables.

use std::path::Path;

use anyhow::Context;
use authn_gateway::AuthnGatewayConfig;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use ip_allowlist::IpAllowListConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "PORTAL__";

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_owned()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub authn: AuthnGatewayConfig,
    pub ip_allowlist: IpAllowListConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Whole-request deadline; exceeded requests get 504.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from an optional YAML file, then apply `PORTAL__SECTION__KEY` overrides.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly given file does not exist or the merged
    /// configuration does not deserialize.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            anyhow::ensure!(
                path.exists(),
                "configuration file {} does not exist",
                path.display()
            );
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Pretty-printed effective configuration. Secrets and the store DSN are redacted.
    #[must_use]
    #[allow(clippy::use_debug)]
    pub fn render(&self) -> String {
        format!("{self:#?}")
    }

    /// # Errors
    ///
    /// Fails if the providers do not yield a valid configuration.
    pub fn from_figment(figment: &Figment) -> anyhow::Result<Self> {
        figment
            .extract()
            .context("failed to load portal configuration")
    }
}
