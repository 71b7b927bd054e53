//! `AuthN` Gateway Module
//!
//! Validates bearer credentials issued either by the federated identity
//! broker or by this system's own session signer, derives the caller's role
//! from group/scope claims and exposes three axum guards
//! (authenticated, allowed-group, admin-only) built on top of it.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::rest::guards::{GuardState, require_admin, require_allowed_group, require_authenticated};
pub use config::AuthnGatewayConfig;
pub use domain::hybrid::HybridAuthenticator;
