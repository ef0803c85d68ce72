//! Structural checks applied before a proxy URL is trusted
//!
//! Only bare-IP proxies are accepted; anything with a domain host is rejected.

use std::net::IpAddr;
use url::Url;

/// Returns true when `host` is not an IP address literal
pub fn is_ip_invalid(host: &str) -> bool {
    host.parse::<IpAddr>().is_err()
}

/// Returns true when `uri` parses as an absolute URL whose host is an IP address
///
/// The host is taken from `uri` as written. `Url` rewrites `http` hosts such
/// as `2130706433` or `0x7f.1` into dotted IPv4, which are not IP literals.
pub fn is_url_valid(uri: &str) -> bool {
    if Url::parse(uri).is_err() {
        return false;
    }

    match raw_host(uri) {
        Some(host) => !is_ip_invalid(host),
        None => false,
    }
}

/// Host text between `://` and the port, userinfo and brackets removed
fn raw_host(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split_once(']').map(|(host, _)| host);
    }
    Some(host_port.rsplit_once(':').map_or(host_port, |(host, _)| host))
}
