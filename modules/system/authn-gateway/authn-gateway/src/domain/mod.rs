//! Domain layer for the `AuthN` gateway.

pub mod claims;
pub mod federated;
pub mod hybrid;
pub mod idp;
pub mod local;
pub mod roles;
pub mod validator;

pub use claims::Claims;
pub use federated::{FederatedIdentity, FederatedTokenValidator};
pub use hybrid::HybridAuthenticator;
pub use idp::{IdentityProvider, IdpError};
pub use local::LocalTokenValidator;
pub use roles::RoleResolver;
pub use validator::TokenValidator;
