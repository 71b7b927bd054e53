//! IP Allow-List Module
//!
//! Persists allowed client addresses and CIDR ranges, serves them through a
//! TTL cache and gates every request on the client address before any
//! authentication runs. Administrators manage entries over REST.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::rest::middleware::{IpGateState, ip_allowlist_middleware};
pub use config::{IpAllowListConfig, StoreConfig};
pub use domain::{AllowListService, IpAllowListGate};
pub use module::IpAllowListModule;
