//! Port to the federated identity provider's own verification routine.

use async_trait::async_trait;
use authn_gateway_sdk::AuthError;

use super::claims::Claims;
use crate::config::FederatedConfig;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdpError {
    /// The provider answered and refused the credential.
    #[error("credential rejected by identity provider: {0}")]
    Rejected(String),

    /// The provider could not be reached or failed internally.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<IdpError> for AuthError {
    fn from(e: IdpError) -> Self {
        match e {
            IdpError::Rejected(msg) => Self::VerificationFailed(msg),
            IdpError::Unavailable(msg) => Self::ProviderUnavailable(msg),
        }
    }
}

/// Builds a security context for a raw credential the gateway cannot parse itself
/// (opaque or differently shaped tokens).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the token info as a claims object.
    ///
    /// # Errors
    ///
    /// [`IdpError::Rejected`] for inactive or unknown credentials,
    /// [`IdpError::Unavailable`] for transport or server failures.
    async fn create_security_context(
        &self,
        credential: &str,
        config: &FederatedConfig,
    ) -> Result<Claims, IdpError>;
}
