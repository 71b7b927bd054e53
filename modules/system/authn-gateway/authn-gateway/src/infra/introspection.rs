//! Identity provider security-context call over OAuth2 token introspection (RFC 7662).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use crate::config::FederatedConfig;
use crate::domain::claims::Claims;
use crate::domain::idp::{IdentityProvider, IdpError};

pub struct IntrospectionClient {
    http: reqwest::Client,
}

impl IntrospectionClient {
    /// # Errors
    ///
    /// Returns the reqwest builder error if the HTTP client cannot be created.
    pub fn new(config: &FederatedConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl IdentityProvider for IntrospectionClient {
    async fn create_security_context(
        &self,
        credential: &str,
        config: &FederatedConfig,
    ) -> Result<Claims, IdpError> {
        let url = config.introspection_url();
        let response = self
            .http
            .post(&url)
            .basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
            .form(&[("token", credential), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| IdpError::Unavailable(format!("introspection request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(IdpError::Unavailable(format!(
                "introspection endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(IdpError::Rejected(format!(
                "introspection endpoint returned {status}"
            )));
        }

        let token_info: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| IdpError::Rejected(format!("unreadable token info: {e}")))?;

        if token_info.get("active").and_then(Value::as_bool) != Some(true) {
            return Err(IdpError::Rejected("token is not active".to_owned()));
        }

        tracing::debug!(url = %url, "identity provider accepted credential");
        Ok(Claims::from_map(token_info))
    }
}
