//! IP Allow-List SDK
//!
//! This crate provides the public API for the `ip_allowlist` module:
//!
//! - [`AllowListStore`] - Persistence port for allow-list entries
//! - [`AllowListEntry`] - A persisted IP, CIDR or `localhost` entry
//! - [`AllowListError`] - Error type for store and management operations

pub mod api;
pub mod error;
pub mod models;

pub use api::AllowListStore;
pub use error::AllowListError;
pub use models::{AllowListEntry, AllowListEntryPatch, NewAllowListEntry};
