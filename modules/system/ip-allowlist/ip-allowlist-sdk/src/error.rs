use thiserror::Error;

/// Errors from the allow-list store and management operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowListError {
    #[error("allow-list entry {id} not found")]
    NotFound { id: i64 },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("allow-list entry '{ip_address}' already exists")]
    Conflict { ip_address: String },

    /// Backend failure. The detail is for logs only.
    #[error("allow-list store unavailable: {0}")]
    Unavailable(String),
}

impl AllowListError {
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable(detail.into())
    }
}
