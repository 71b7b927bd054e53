//! Self-issued session tokens (HS256, shared secret).

use std::sync::Arc;

use async_trait::async_trait;
use authn_gateway_sdk::AuthError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use portal_security::{Clock, Identity, IdentitySource, Role};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::claims::Claims;
use super::validator::TokenValidator;
use crate::config::LocalTokenConfig;

/// Claims carried by a session token. The role is embedded at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct LocalTokenValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LocalTokenValidator {
    #[must_use]
    pub fn new(config: &LocalTokenConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        // Expiry is judged against the injected clock, not the system clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[config.issuer.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            ttl: Duration::seconds(i64::try_from(config.ttl_secs).unwrap_or(i64::MAX)),
            clock,
        }
    }

    /// Mint a session token for `identity`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns the signer's error if the claims cannot be encoded.
    pub fn issue(&self, identity: &Identity) -> Result<String, jsonwebtoken::errors::Error> {
        let now = self.clock.now();
        let claims = SessionClaims {
            sub: identity.subject_id().to_owned(),
            user_id: identity.user_id().to_owned(),
            email: identity.email().map(str::to_owned),
            given_name: identity.given_name().map(str::to_owned),
            family_name: identity.family_name().map(str::to_owned),
            company_code: Some(identity.company_code().to_owned()),
            is_admin: identity.is_admin(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    fn verify(&self, credential: &str) -> Result<SessionClaims, AuthError> {
        jsonwebtoken::decode::<SessionClaims>(credential, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::verification(e.to_string()))
    }
}

#[async_trait]
impl TokenValidator for LocalTokenValidator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn validate(&self, credential: &str) -> Result<Identity, AuthError> {
        // An expired credential is rejected as such before its signature is checked,
        // so callers see the same error whichever trust source it came from.
        let unverified = Claims::decode(credential)?;
        let now = self.clock.now();
        if unverified.is_expired(now)? {
            return Err(AuthError::ExpiredCredential);
        }

        let claims = self.verify(credential)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::malformed("exp is out of range"))?;
        if expires_at <= now {
            return Err(AuthError::ExpiredCredential);
        }

        let role = if claims.is_admin { Role::Admin } else { Role::User };
        Ok(Identity::builder(IdentitySource::Local)
            .subject_id(claims.sub)
            .user_id(claims.user_id)
            .email(claims.email)
            .given_name(claims.given_name)
            .family_name(claims.family_name)
            .company_code(claims.company_code)
            .role(role)
            .expires_at(Some(expires_at))
            .bearer_token(credential.to_owned())
            .build())
    }
}
