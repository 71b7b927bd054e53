//! Domain layer for the IP allow-list gate.

pub mod cache;
pub mod gate;
pub mod log_aggregation;
pub mod matcher;
pub mod service;

pub use cache::{AllowListCache, Snapshot};
pub use gate::IpAllowListGate;
pub use log_aggregation::{AllowLog, AllowLogAggregator};
pub use service::{AddEntry, AllowListService};
