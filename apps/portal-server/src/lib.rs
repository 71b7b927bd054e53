//! Router assembly for the IT request portal backend.
//!
//! Every request first passes the IP allow-list gate; guarded routes then run
//! the hybrid authenticator through one of the three access tiers.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use authn_gateway::{
    GuardState, HybridAuthenticator, require_admin, require_allowed_group, require_authenticated,
};
use authn_gateway_sdk::AuthenticatorClient;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use chrono::{DateTime, Utc};
use ip_allowlist::{IpAllowListModule, ip_allowlist_middleware};
use portal_security::{Clock, Identity, IdentitySource, Role};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct MeResponse {
    subject_id: String,
    user_id: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    company_code: String,
    role: Role,
    is_admin: bool,
    source: IdentitySource,
    expires_at: Option<DateTime<Utc>>,
}

impl From<&Identity> for MeResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            subject_id: identity.subject_id().to_owned(),
            user_id: identity.user_id().to_owned(),
            email: identity.email().map(str::to_owned),
            given_name: identity.given_name().map(str::to_owned),
            family_name: identity.family_name().map(str::to_owned),
            company_code: identity.company_code().to_owned(),
            role: identity.role(),
            is_admin: identity.is_admin(),
            source: identity.source(),
            expires_at: identity.expires_at(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn me(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse::from(&identity))
}

async fn portal_access(Extension(identity): Extension<Identity>) -> Json<Value> {
    Json(json!({
        "access": "granted",
        "role": identity.role(),
        "is_admin": identity.is_admin(),
    }))
}

/// Wired portal: authenticator guards plus the allow-list module.
pub struct Portal {
    guards: GuardState,
    ip_allowlist: IpAllowListModule,
    request_timeout: Duration,
}

impl Portal {
    /// Build the authenticator and open the allow-list store.
    ///
    /// # Errors
    ///
    /// Fails on invalid authentication settings or an unreachable store.
    pub async fn init(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let authenticator = HybridAuthenticator::from_config(&config.authn, clock.clone())
            .context("invalid authn configuration")?;
        tracing::info!(
            federated = config.authn.active_federated().is_some(),
            "hybrid authenticator ready"
        );

        let ip_allowlist = IpAllowListModule::init(config.ip_allowlist.clone(), clock)
            .await
            .context("failed to initialize IP allow-list")?;

        Ok(Self::from_parts(
            Arc::new(authenticator),
            config.authn.roles.allowed_groups(),
            ip_allowlist,
            Duration::from_millis(config.server.request_timeout_ms),
        ))
    }

    #[must_use]
    pub fn from_parts(
        authenticator: Arc<dyn AuthenticatorClient>,
        allowed_groups: Vec<String>,
        ip_allowlist: IpAllowListModule,
        request_timeout: Duration,
    ) -> Self {
        Self {
            guards: GuardState::new(authenticator, allowed_groups),
            ip_allowlist,
            request_timeout,
        }
    }

    #[must_use]
    pub fn ip_allowlist(&self) -> &IpAllowListModule {
        &self.ip_allowlist
    }

    /// Full application router.
    ///
    /// Layer order, outermost first: trace, timeout, IP gate, then the
    /// per-route access guard.
    #[must_use]
    pub fn router(&self) -> Router {
        let authenticated = Router::new()
            .route("/api/me", get(me))
            .route_layer(middleware::from_fn_with_state(
                self.guards.clone(),
                require_authenticated,
            ));

        let members = Router::new()
            .route("/api/portal/access", get(portal_access))
            .route_layer(middleware::from_fn_with_state(
                self.guards.clone(),
                require_allowed_group,
            ));

        let admins = self
            .ip_allowlist
            .management_router()
            .route_layer(middleware::from_fn_with_state(
                self.guards.clone(),
                require_admin,
            ));

        Router::new()
            .route("/health", get(health))
            .merge(authenticated)
            .merge(members)
            .merge(admins)
            .layer(middleware::from_fn_with_state(
                self.ip_allowlist.gate_state(),
                ip_allowlist_middleware,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                self.request_timeout,
            ))
            .layer(TraceLayer::new_for_http())
    }
}
