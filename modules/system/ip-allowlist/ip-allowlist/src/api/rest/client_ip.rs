//! Client address resolution.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request};

use crate::domain::matcher::normalize_client_ip;

/// Used when no address can be determined. Never matches an entry.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Normalized client address for `req`.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` hop wins (falling
/// back to `X-Real-IP`); otherwise only the socket peer address is used.
/// A forwarded value that is not an IP address yields [`UNKNOWN_CLIENT`].
#[must_use]
pub fn client_ip(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for && let Some(forwarded) = forwarded_ip(req) {
        return match forwarded.parse::<IpAddr>() {
            Ok(ip) => ip.to_canonical().to_string(),
            Err(_) => UNKNOWN_CLIENT.to_owned(),
        };
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(
            || UNKNOWN_CLIENT.to_owned(),
            |ConnectInfo(addr)| normalize_client_ip(&addr.ip().to_string()),
        )
}

fn forwarded_ip(req: &Request) -> Option<&str> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for").or_else(|| header("x-real-ip"))
}
