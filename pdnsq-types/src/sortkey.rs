//! Lossy, lexicographically collatable key renditions used only as external
//! sort keys (§4.5 `sortable_rrname`/`sortable_rdata`). These are never
//! re-parsed back into a name or address; only their ordering matters.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::name::reverse_name;

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Label-reversed, alphanumerics-only (plus `.` as a label separator),
/// lowercased rendition of a DNS name.
#[must_use]
pub fn sortable_dnsname(name: &str) -> String {
    reverse_name(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[must_use]
pub fn sortable_rrname(rrname: &str) -> String {
    sortable_dnsname(rrname)
}

/// Token after the last space in `s`; `None` if there is no space.
fn last_space_token(s: &str) -> Option<&str> {
    s.rsplit(' ').next().filter(|_| s.contains(' '))
}

/// Builds the lossy sort key for one rdata value, per spec.md §4.5.
#[must_use]
pub fn sortable_rdata(rrtype: &str, rdata: &str) -> String {
    match rrtype.to_ascii_uppercase().as_str() {
        "A" => rdata
            .parse::<Ipv4Addr>()
            .map(|ip| hex_encode(&ip.octets()))
            .unwrap_or_else(|_| "0".repeat(8)),
        "AAAA" => rdata
            .parse::<Ipv6Addr>()
            .map(|ip| hex_encode(&ip.octets()))
            .unwrap_or_else(|_| "0".repeat(32)),
        "NS" | "PTR" | "CNAME" | "DNAME" => sortable_dnsname(rdata),
        "MX" | "RP" => last_space_token(rdata)
            .map(sortable_dnsname)
            .unwrap_or_else(|| hex_encode(rdata.as_bytes())),
        _ => hex_encode(rdata.as_bytes()),
    }
}
