//! Federated-then-local credential validation.

use std::sync::Arc;

use async_trait::async_trait;
use authn_gateway_sdk::{AuthError, AuthenticatorClient};
use portal_security::{Clock, Identity};

use super::federated::FederatedTokenValidator;
use super::local::LocalTokenValidator;
use super::roles::RoleResolver;
use super::validator::TokenValidator;
use crate::config::{AuthnGatewayConfig, ConfigError};
use crate::infra::introspection::IntrospectionClient;

/// Orchestrates the two trust sources.
///
/// `Start -> TryFederated -> (Success | TryLocal) -> (Success | Fail)`
///
/// - Missing or empty credential: `MissingCredential`, no validator runs.
/// - Federated configured: federated first; any failure leads to exactly one
///   local attempt, whose error is the one returned.
/// - Federated not configured: local is the only path.
pub struct HybridAuthenticator {
    federated: Option<Arc<dyn TokenValidator>>,
    local: Arc<dyn TokenValidator>,
}

impl HybridAuthenticator {
    #[must_use]
    pub fn new(federated: Option<Arc<dyn TokenValidator>>, local: Arc<dyn TokenValidator>) -> Self {
        Self { federated, local }
    }

    /// Wire the production validators from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid configuration or when the identity
    /// provider HTTP client cannot be built.
    pub fn from_config(cfg: &AuthnGatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let local: Arc<dyn TokenValidator> =
            Arc::new(LocalTokenValidator::new(&cfg.local, clock.clone()));

        let federated = match cfg.active_federated() {
            Some(federated_cfg) => {
                let provider = Arc::new(IntrospectionClient::new(federated_cfg)?);
                let roles = RoleResolver::new(&cfg.roles)?;
                tracing::info!(
                    issuer = %federated_cfg.issuer_url,
                    client_id = %federated_cfg.client_id,
                    "federated validation enabled"
                );
                Some(Arc::new(FederatedTokenValidator::new(
                    federated_cfg.clone(),
                    provider,
                    roles,
                    clock,
                )) as Arc<dyn TokenValidator>)
            }
            None => {
                tracing::info!("federated validation not configured, using local session tokens only");
                None
            }
        };

        Ok(Self::new(federated, local))
    }

    #[must_use]
    pub fn has_federated(&self) -> bool {
        self.federated.is_some()
    }
}

#[async_trait]
impl AuthenticatorClient for HybridAuthenticator {
    async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let Some(federated) = &self.federated else {
            return self.local.validate(credential).await;
        };

        match federated.validate(credential).await {
            Ok(identity) => Ok(identity),
            Err(federated_err) => {
                tracing::debug!(
                    validator = federated.name(),
                    error.kind = federated_err.kind(),
                    error = %federated_err,
                    "federated validation failed, falling back to {}",
                    self.local.name()
                );
                self.local.validate(credential).await
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::Ordering;

    use portal_security::Role;
    use tracing_test::traced_test;

    use super::*;
    use crate::test_support::ScriptedValidator;

    #[tokio::test]
    async fn missing_or_blank_credential_short_circuits() {
        let federated = ScriptedValidator::succeeding("federated", Role::Admin);
        let local = ScriptedValidator::succeeding("local", Role::User);
        let (fed_calls, local_calls) = (federated.calls(), local.calls());
        let auth = HybridAuthenticator::new(Some(Arc::new(federated)), Arc::new(local));

        assert_eq!(
            auth.authenticate(None).await.unwrap_err(),
            AuthError::MissingCredential
        );
        assert_eq!(
            auth.authenticate(Some("   ")).await.unwrap_err(),
            AuthError::MissingCredential
        );
        assert_eq!(fed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn federated_success_skips_local() {
        let federated = ScriptedValidator::succeeding("federated", Role::Admin);
        let local = ScriptedValidator::succeeding("local", Role::User);
        let local_calls = local.calls();
        let auth = HybridAuthenticator::new(Some(Arc::new(federated)), Arc::new(local));

        let identity = auth.authenticate(Some("tok")).await.unwrap();

        assert_eq!(identity.subject_id(), "federated");
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_federated_failure_triggers_exactly_one_local_attempt() {
        for err in [
            AuthError::malformed("x"),
            AuthError::ExpiredCredential,
            AuthError::verification("x"),
            AuthError::unavailable("x"),
        ] {
            let federated = ScriptedValidator::failing("federated", err);
            let local = ScriptedValidator::succeeding("local", Role::User);
            let (fed_calls, local_calls) = (federated.calls(), local.calls());
            let auth = HybridAuthenticator::new(Some(Arc::new(federated)), Arc::new(local));

            let identity = auth.authenticate(Some("tok")).await.unwrap();

            assert_eq!(identity.subject_id(), "local");
            assert_eq!(fed_calls.load(Ordering::SeqCst), 1);
            assert_eq!(local_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn fallback_hop_is_logged() {
        let federated = ScriptedValidator::failing("federated", AuthError::ExpiredCredential);
        let local = ScriptedValidator::succeeding("local", Role::User);
        let auth = HybridAuthenticator::new(Some(Arc::new(federated)), Arc::new(local));

        auth.authenticate(Some("tok")).await.unwrap();

        assert!(logs_contain("falling back to local"));
        assert!(logs_contain("expired_credential"));
    }

    #[tokio::test]
    async fn last_validator_error_is_surfaced() {
        let federated = ScriptedValidator::failing("federated", AuthError::unavailable("idp down"));
        let local = ScriptedValidator::failing("local", AuthError::verification("bad signature"));
        let local_calls = local.calls();
        let auth = HybridAuthenticator::new(Some(Arc::new(federated)), Arc::new(local));

        let err = auth.authenticate(Some("tok")).await.unwrap_err();

        assert_eq!(err, AuthError::verification("bad signature"));
        assert_eq!(local_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_only_when_federated_not_configured() {
        let local = ScriptedValidator::failing("local", AuthError::ExpiredCredential);
        let local_calls = local.calls();
        let auth = HybridAuthenticator::new(None, Arc::new(local));

        assert!(!auth.has_federated());
        assert_eq!(
            auth.authenticate(Some("tok")).await.unwrap_err(),
            AuthError::ExpiredCredential
        );
        assert_eq!(local_calls.load(Ordering::SeqCst), 1);
    }
}
