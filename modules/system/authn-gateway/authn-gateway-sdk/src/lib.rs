//! `AuthN` Gateway SDK
//!
//! This crate provides the public API for the `authn_gateway` module:
//!
//! - [`AuthenticatorClient`] - Credential validation trait for consumers
//! - [`AuthError`] - Authentication failure kinds
//! - [`AccessDecision`] - Outcome of a guard or gate evaluation
//!
//! ## Usage
//!
//! ```ignore
//! use authn_gateway_sdk::AuthenticatorClient;
//!
//! let identity = authenticator.authenticate(Some(token)).await?;
//! if identity.is_admin() { /* ... */ }
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::AuthenticatorClient;
pub use error::AuthError;
pub use models::{AccessDecision, AccessTier, Outcome};
