//! Async half of the AS-info annotator (§4.6, C6): issues the DNS TXT query
//! against the configured AS-info zone and hands the answer segments to
//! `pdnsq_types::asinfo`'s pure parsing.
//!
//! Gated behind the `asinfo` feature (default-on) so a build can omit the
//! `hickory-resolver` dependency entirely (§4.6's "must compile with a build
//! flag that omits AS-info").

use hickory_resolver::TokioResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use pdnsq_types::asinfo::{AsInfo, AsInfoError, best_prefix, parse_txt_segments};

#[derive(Debug, thiserror::Error)]
pub enum AsInfoLookupError {
    #[error("DNS TXT lookup failed: {0}")]
    Resolve(String),
    #[error(transparent)]
    Parse(#[from] AsInfoError),
    #[error("no usable AS-info answers")]
    NoAnswers,
}

/// Reverses the four octets of an IPv4 address and appends the configured
/// zone, e.g. `8.8.8.8` + `asn.cymru.com` → `8.8.8.8.asn.cymru.com`.
#[must_use]
pub fn ipv4_query_name(addr: std::net::Ipv4Addr, zone: &str) -> String {
    let octets = addr.octets();
    format!(
        "{}.{}.{}.{}.{}",
        octets[3], octets[2], octets[1], octets[0], zone
    )
}

/// Nibble-reverses the 16 octets of an IPv6 address into the zone. Retained
/// as a placeholder path for future data sources (§4.6); no public AS-info
/// service is known to answer this shape today.
#[must_use]
pub fn ipv6_query_name(addr: std::net::Ipv6Addr, zone: &str) -> String {
    let mut nibbles = String::with_capacity(32 * 2);
    for byte in addr.octets().iter().rev() {
        nibbles.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
    }
    format!("{nibbles}{zone}")
}

/// Looks up AS-info for an IPv4 address, selecting the best (most specific)
/// prefix among all returned TXT answers (§4.6, invariant 3).
pub async fn lookup_v4(addr: std::net::Ipv4Addr, zone: &str) -> Result<AsInfo, AsInfoLookupError> {
    let resolver = TokioResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    let name = ipv4_query_name(addr, zone);

    let response = resolver
        .txt_lookup(name)
        .await
        .map_err(|e| AsInfoLookupError::Resolve(e.to_string()))?;

    let mut candidates = Vec::new();
    for txt in response.iter() {
        let segments: Vec<String> = txt
            .txt_data()
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        if let Ok(info) = parse_txt_segments(&segments) {
            candidates.push(info);
        }
    }

    best_prefix(&candidates)
        .cloned()
        .ok_or(AsInfoLookupError::NoAnswers)
}
