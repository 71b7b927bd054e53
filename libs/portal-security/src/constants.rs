/// Company scope code assigned when a credential carries none.
pub const DEFAULT_COMPANY_CODE: &str = "1000";

/// Literal allow-list entry that stands for every loopback address.
pub const LOCALHOST_ALIAS: &str = "localhost";
