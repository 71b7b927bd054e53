//! Public API trait for credential validation.

use async_trait::async_trait;
use portal_security::Identity;

use crate::error::AuthError;

/// Validates a bearer credential and returns the canonical identity.
///
/// Implemented by the hybrid authenticator; consumed by the access guards
/// and by any module that needs the caller's identity outside a guarded route.
#[async_trait]
pub trait AuthenticatorClient: Send + Sync {
    /// Authenticate a raw bearer credential (without the `Bearer ` prefix).
    ///
    /// # Errors
    ///
    /// - `MissingCredential` if `credential` is absent or empty
    /// - `MalformedCredential` if the credential cannot be parsed
    /// - `ExpiredCredential` if the credential's expiry has passed
    /// - `VerificationFailed` if no trust source accepts the credential
    /// - `ProviderUnavailable` if the identity provider could not be reached
    async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError>;
}
