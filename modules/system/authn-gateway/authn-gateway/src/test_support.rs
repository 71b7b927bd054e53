//! Helpers shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use authn_gateway_sdk::AuthError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use portal_security::{Identity, IdentitySource, Role};
use serde_json::Value;

use crate::domain::validator::TokenValidator;

/// Compact JWS with the given payload and a dummy signature.
pub fn unsigned_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

/// Validator double that records how often it ran and returns a fixed result.
pub struct ScriptedValidator {
    name: &'static str,
    result: Result<Role, AuthError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedValidator {
    pub fn succeeding(name: &'static str, role: Role) -> Self {
        Self {
            name,
            result: Ok(role),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &'static str, err: AuthError) -> Self {
        Self {
            name,
            result: Err(err),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TokenValidator for ScriptedValidator {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn validate(&self, _credential: &str) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map(|role| {
            Identity::builder(IdentitySource::Local)
                .subject_id(self.name)
                .role(role)
                .build()
        })
    }
}
