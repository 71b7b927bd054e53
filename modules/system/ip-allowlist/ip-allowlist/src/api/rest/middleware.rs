//! axum middleware running the allow-list gate ahead of every route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::client_ip::client_ip;
use super::deny::deny_response;
use crate::domain::IpAllowListGate;

#[derive(Clone)]
pub struct IpGateState {
    gate: Arc<IpAllowListGate>,
    trust_forwarded_for: bool,
    api_prefix: Arc<str>,
}

impl IpGateState {
    #[must_use]
    pub fn new(gate: Arc<IpAllowListGate>, trust_forwarded_for: bool, api_prefix: &str) -> Self {
        Self {
            gate,
            trust_forwarded_for,
            api_prefix: Arc::from(api_prefix.trim_end_matches('/')),
        }
    }

    fn is_api_path(&self, path: &str) -> bool {
        path.strip_prefix(&*self.api_prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

pub async fn ip_allowlist_middleware(
    State(state): State<IpGateState>,
    req: Request,
    next: Next,
) -> Response {
    let client_ip = client_ip(&req, state.trust_forwarded_for);
    let path = req.uri().path().to_owned();

    let decision = state.gate.evaluate(&path, &client_ip).await;
    if decision.is_allowed() {
        return next.run(req).await;
    }

    deny_response(&client_ip, state.is_api_path(&path))
}
