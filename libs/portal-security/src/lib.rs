#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod clock;
pub mod constants;
pub mod identity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Identity, IdentityBuilder, IdentitySource, Role};
