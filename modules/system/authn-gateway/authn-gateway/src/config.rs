//! Configuration for the `AuthN` gateway.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

fn default_true() -> bool {
    true
}

fn default_introspection_path() -> String {
    "/oauth/token/introspect".to_owned()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_local_issuer() -> String {
    "it-portal".to_owned()
}

fn default_session_ttl_secs() -> u64 {
    8 * 60 * 60
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Top-level configuration, read once at startup.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AuthnGatewayConfig {
    /// Federated identity broker. Absent or disabled means local tokens only.
    pub federated: Option<FederatedConfig>,
    pub local: LocalTokenConfig,
    pub roles: RoleConfig,
}

impl AuthnGatewayConfig {
    /// Federated settings, if the federated path is configured and switched on.
    #[must_use]
    pub fn active_federated(&self) -> Option<&FederatedConfig> {
        self.federated.as_ref().filter(|f| f.is_usable())
    }

    /// Check the settings that cannot be defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the local signing secret is empty or the
    /// federated provider is enabled without an issuer URL or client id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local.secret.expose_secret().is_empty() {
            return Err(ConfigError::MissingLocalSecret);
        }
        if let Some(federated) = &self.federated
            && federated.enabled
            && !federated.is_usable()
        {
            return Err(ConfigError::IncompleteFederated);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("authn.local.secret must not be empty")]
    MissingLocalSecret,

    #[error("authn.federated requires issuer_url and client_id when enabled")]
    IncompleteFederated,

    #[error("invalid role configuration: {0}")]
    InvalidRoles(#[from] regex::Error),

    #[error("failed to build identity provider client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Federated identity broker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FederatedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub issuer_url: String,
    pub client_id: String,
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub client_secret: SecretString,
    /// Path appended to `issuer_url` for the token introspection call.
    #[serde(default = "default_introspection_path")]
    pub introspection_path: String,
    /// Upper bound for one identity provider round-trip.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl FederatedConfig {
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.issuer_url.trim().is_empty() && !self.client_id.trim().is_empty()
    }

    #[must_use]
    pub fn introspection_url(&self) -> String {
        format!(
            "{}{}",
            self.issuer_url.trim_end_matches('/'),
            self.introspection_path
        )
    }
}

/// Self-issued session token settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalTokenConfig {
    /// HMAC secret shared by the session signer and the validator.
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,
    /// Value of the `iss` claim written and required on session tokens.
    pub issuer: String,
    /// Lifetime of issued session tokens.
    pub ttl_secs: u64,
}

impl Default for LocalTokenConfig {
    fn default() -> Self {
        Self {
            secret: empty_secret(),
            issuer: default_local_issuer(),
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

/// Group names and application id used to derive roles from federated claims.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    /// Application identifier used to build the legacy admin scope pattern.
    pub app_id: String,
    pub admin_groups: Vec<String>,
    pub user_groups: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            app_id: "it-portal".to_owned(),
            admin_groups: vec!["ADMIN-GROUP".to_owned()],
            user_groups: vec!["USER-GROUP".to_owned()],
        }
    }
}

impl RoleConfig {
    /// Groups accepted by the allowed-group guard.
    #[must_use]
    pub fn allowed_groups(&self) -> Vec<String> {
        self.admin_groups
            .iter()
            .chain(&self.user_groups)
            .cloned()
            .collect()
    }
}
