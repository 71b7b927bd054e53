//! Matching client addresses against allow-list entries.

use std::net::{IpAddr, Ipv4Addr};

use portal_security::constants::LOCALHOST_ALIAS;

/// Canonical textual form of a client address.
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.5`) become dotted IPv4 so they
/// can match IPv4 entries. Unparseable input is returned trimmed.
#[must_use]
pub fn normalize_client_ip(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical().to_string(),
        Err(_) => raw.to_owned(),
    }
}

/// Form in which an entry is stored.
///
/// IP literals are written the way [`normalize_client_ip`] writes client
/// addresses, and the alias is lowercased. Anything else is only trimmed.
#[must_use]
pub fn canonical_entry(entry: &str) -> String {
    let entry = entry.trim();
    if entry.eq_ignore_ascii_case(LOCALHOST_ALIAS) {
        return LOCALHOST_ALIAS.to_owned();
    }
    match entry.parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical().to_string(),
        Err(_) => entry.to_owned(),
    }
}

/// Whether one entry admits `client_ip` (already normalized).
///
/// Rules, in order: the `localhost` alias admits loopback addresses; an IP
/// literal admits the same address in any spelling; `network/prefix` admits
/// IPv4 addresses inside the block.
#[must_use]
pub fn matches_entry(entry: &str, client_ip: &str) -> bool {
    let entry = entry.trim();

    if entry.eq_ignore_ascii_case(LOCALHOST_ALIAS) {
        return client_ip
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback());
    }
    if entry == client_ip {
        return true;
    }
    if let Ok(ip) = entry.parse::<IpAddr>() {
        return ip.to_canonical().to_string() == client_ip;
    }
    match parse_ipv4_cidr(entry) {
        Some((network, prefix)) => client_ip
            .parse::<Ipv4Addr>()
            .is_ok_and(|ip| in_block(ip, network, prefix)),
        None => false,
    }
}

/// Any single matching entry allows the client.
#[must_use]
pub fn is_allowed<S: AsRef<str>>(entries: &[S], client_ip: &str) -> bool {
    entries.iter().any(|e| matches_entry(e.as_ref(), client_ip))
}

/// Check that an entry is something the matcher can use.
///
/// # Errors
///
/// Returns a message describing why the entry is not `localhost`, an IP
/// literal, or an IPv4 CIDR block with prefix 0 to 32.
pub fn validate_entry(entry: &str) -> Result<(), String> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err("must not be empty".to_owned());
    }
    if entry.eq_ignore_ascii_case(LOCALHOST_ALIAS) || entry.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if entry.contains('/') {
        return parse_ipv4_cidr(entry)
            .map(|_| ())
            .ok_or_else(|| format!("'{entry}' is not an IPv4 CIDR block with prefix 0-32"));
    }
    Err(format!("'{entry}' is not an IP address, CIDR block or '{LOCALHOST_ALIAS}'"))
}

fn parse_ipv4_cidr(entry: &str) -> Option<(Ipv4Addr, u8)> {
    let (network, prefix) = entry.split_once('/')?;
    let network = network.trim().parse::<Ipv4Addr>().ok()?;
    let prefix = prefix.trim().parse::<u8>().ok().filter(|p| *p <= 32)?;
    Some((network, prefix))
}

fn in_block(ip: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    // Prefix 0 shifts by 32, which overflows; the mask is then empty.
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    u32::from(ip) & mask == u32::from(network) & mask
}
