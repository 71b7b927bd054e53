//! Route guards: authenticated, allowed-group and admin-only.
//!
//! Each guard runs the authenticator itself; no state is shared between guards
//! so routes can compose whichever tier they need.

use std::sync::Arc;

use authn_gateway_sdk::{AccessDecision, AccessTier, AuthError, AuthenticatorClient};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use portal_security::Identity;

use super::error::{forbidden, unauthorized};

const MISSING_CREDENTIAL_MESSAGE: &str = "Authentication required";
const INVALID_CREDENTIAL_MESSAGE: &str = "Invalid or expired token";
const ADMIN_REQUIRED_MESSAGE: &str = "Access denied: administrator role required";

/// Shared state for the guard middlewares.
#[derive(Clone)]
pub struct GuardState {
    authenticator: Arc<dyn AuthenticatorClient>,
    allowed_groups: Arc<[String]>,
}

impl GuardState {
    #[must_use]
    pub fn new(authenticator: Arc<dyn AuthenticatorClient>, allowed_groups: Vec<String>) -> Self {
        Self {
            authenticator,
            allowed_groups: allowed_groups.into(),
        }
    }

    #[must_use]
    pub fn allowed_groups(&self) -> &[String] {
        &self.allowed_groups
    }
}

#[must_use]
pub fn decide_authenticated(result: &Result<Identity, AuthError>) -> AccessDecision {
    match result {
        Ok(identity) => AccessDecision::allow(
            AccessTier::Authenticated,
            format!("authenticated as {}", identity.subject_id()),
        ),
        Err(err) => AccessDecision::deny(AccessTier::Authenticated, err.kind()),
    }
}

#[must_use]
pub fn decide_allowed_group(identity: &Identity, allowed_groups: &[String]) -> AccessDecision {
    if identity.is_admin() {
        AccessDecision::allow(AccessTier::AllowedGroup, "administrator")
    } else if identity.is_recognized_member() {
        AccessDecision::allow(AccessTier::AllowedGroup, "recognized group member")
    } else {
        AccessDecision::deny(
            AccessTier::AllowedGroup,
            format!(
                "Access denied: requires membership in one of: {}",
                allowed_groups.join(", ")
            ),
        )
    }
}

#[must_use]
pub fn decide_admin_only(identity: &Identity) -> AccessDecision {
    if identity.is_admin() {
        AccessDecision::allow(AccessTier::AdminOnly, "administrator")
    } else {
        AccessDecision::deny(AccessTier::AdminOnly, ADMIN_REQUIRED_MESSAGE)
    }
}

/// Tier 1: a valid credential from either trust source.
pub async fn require_authenticated(
    State(state): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(response) => response,
    }
}

/// Tier 2: authenticated and either a recognized group member or an admin.
pub async fn require_allowed_group(
    State(state): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match authenticate(&state, req.headers()).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let decision = decide_allowed_group(&identity, state.allowed_groups());
    if !decision.is_allowed() {
        log_denial(&decision, &identity);
        return forbidden(decision.reason);
    }

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Tier 3: authenticated administrator.
pub async fn require_admin(
    State(state): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match authenticate(&state, req.headers()).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };

    let decision = decide_admin_only(&identity);
    if !decision.is_allowed() {
        log_denial(&decision, &identity);
        return forbidden(decision.reason);
    }

    req.extensions_mut().insert(identity);
    next.run(req).await
}

async fn authenticate(state: &GuardState, headers: &HeaderMap) -> Result<Identity, Response> {
    let result = state
        .authenticator
        .authenticate(extract_bearer_token(headers))
        .await;

    let decision = decide_authenticated(&result);
    match result {
        Ok(identity) => {
            tracing::trace!(tier = %decision.tier, reason = %decision.reason, "access allowed");
            Ok(identity)
        }
        Err(err) => {
            log_auth_error(&err);
            let message = match err {
                AuthError::MissingCredential => MISSING_CREDENTIAL_MESSAGE,
                _ => INVALID_CREDENTIAL_MESSAGE,
            };
            Err(unauthorized(message))
        }
    }
}

/// Cognitive complexity is inflated by tracing macro expansion.
#[allow(clippy::cognitive_complexity)]
fn log_auth_error(err: &AuthError) {
    match err {
        AuthError::MissingCredential => tracing::debug!("request without credential"),
        AuthError::ProviderUnavailable(msg) => {
            tracing::warn!(error.kind = err.kind(), "identity provider unavailable: {msg}");
        }
        _ => tracing::info!(error.kind = err.kind(), error = %err, "credential rejected"),
    }
}

fn log_denial(decision: &AccessDecision, identity: &Identity) {
    tracing::info!(
        tier = %decision.tier,
        subject_id = identity.subject_id(),
        role = ?identity.role(),
        reason = %decision.reason,
        "access denied"
    );
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::trim))
}
