use async_trait::async_trait;
use authn_gateway_sdk::AuthError;
use portal_security::Identity;

/// One trust source able to turn a credential into an [`Identity`].
///
/// The hybrid authenticator composes two of these; each returns a typed
/// result so fallback is plain control flow.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Validate a non-empty credential.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] except `MissingCredential`, which callers handle first.
    async fn validate(&self, credential: &str) -> Result<Identity, AuthError>;
}
