//! Error types for credential validation.

use thiserror::Error;

/// Why a credential was rejected.
///
/// The payload is diagnostic detail for logs only; responses use fixed messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("credential expired")]
    ExpiredCredential,

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The identity provider could not be reached (federated path only).
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl AuthError {
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedCredential(detail.into())
    }

    #[must_use]
    pub fn verification(detail: impl Into<String>) -> Self {
        Self::VerificationFailed(detail.into())
    }

    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::ProviderUnavailable(detail.into())
    }

    /// Short stable name, used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential(_) => "malformed_credential",
            Self::ExpiredCredential => "expired_credential",
            Self::VerificationFailed(_) => "verification_failed",
            Self::ProviderUnavailable(_) => "provider_unavailable",
        }
    }
}
