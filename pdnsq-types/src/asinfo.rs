//! AS-info annotation (§4.6): pure parsing of TXT-record payloads into
//! ASN + CIDR pairs, and best-prefix selection across multiple answers.
//!
//! The DNS TXT lookup itself is IO and lives in `pdnsq-core::asinfo`; this
//! module is the pure, unit-testable half.

use thiserror::Error;

/// The sentinel ASN meaning "unknown" (§4.6); always discarded.
pub const UNKNOWN_ASN: &str = "4294967295";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsInfo {
    pub asn: String,
    pub cidr: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsInfoError {
    #[error("TXT record has an unrecognized AS-info format")]
    UnknownFormat,
    #[error("ASN is the unknown sentinel ({UNKNOWN_ASN})")]
    UnknownAsn,
    #[error("CIDR prefix length is not a valid integer")]
    BadCidr,
}

/// Parses one TXT record's character-strings into an `(asn, cidr)` pair.
///
/// Two source schemas are recognized (§4.6):
/// - single-segment, `" | "`-delimited: `segment[0]` = ASN, `segment[1]` =
///   CIDR, remaining segments ignored.
/// - three-segment: `segment[0]` = ASN, `segment[1]` = prefix mantissa,
///   `segment[2]` = prefix length, combined as `mantissa/length`.
pub fn parse_txt_segments(segments: &[String]) -> Result<AsInfo, AsInfoError> {
    let (asn, cidr) = if segments.len() == 1 {
        let mut parts = segments[0].split(" | ");
        let asn = parts.next().ok_or(AsInfoError::UnknownFormat)?.trim();
        let cidr = parts.next().ok_or(AsInfoError::UnknownFormat)?.trim();
        (asn.to_string(), cidr.to_string())
    } else if segments.len() >= 3 {
        let asn = segments[0].trim();
        let mantissa = segments[1].trim();
        let len = segments[2].trim();
        (asn.to_string(), format!("{mantissa}/{len}"))
    } else {
        return Err(AsInfoError::UnknownFormat);
    };

    if asn == UNKNOWN_ASN {
        return Err(AsInfoError::UnknownAsn);
    }

    Ok(AsInfo { asn, cidr })
}

fn prefix_len(cidr: &str) -> Result<u8, AsInfoError> {
    cidr.rsplit('/')
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(AsInfoError::BadCidr)
}

/// Picks the answer with the longest (most specific) prefix length from a
/// set of candidate AS-info answers covering the same address (§4.6,
/// invariant 3). Returns `None` for an empty slice.
#[must_use]
pub fn best_prefix(candidates: &[AsInfo]) -> Option<&AsInfo> {
    candidates
        .iter()
        .filter_map(|c| prefix_len(&c.cidr).ok().map(|len| (len, c)))
        .max_by_key(|(len, _)| *len)
        .map(|(_, c)| c)
}
