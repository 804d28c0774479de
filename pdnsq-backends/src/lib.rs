//! Backend capability adapters (§4.1, C1): system-specific URL construction,
//! auth injection, and status mapping, behind one shared [`Backend`] trait.
//!
//! One module per wire dialect, with shared cross-cutting HTTP-client
//! concerns factored into this crate root.

pub mod circl;
pub mod dnsdb_v1;
pub mod dnsdb_v2;
mod path;

pub use circl::Circl;
pub use dnsdb_v1::DnsdbV1;
pub use dnsdb_v2::DnsdbV2;

use pdnsq_types::{Encap, Fence, Mode, QDesc};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{system}: query shape is not supported ({detail})")]
    UnsupportedQuery { system: String, detail: String },
    #[error("{system}: missing required configuration key {key:?}")]
    MissingConfig { system: String, key: &'static str },
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Request-shaping parameters that are not part of the canonical path
/// (§4.1): result/time limits, and whether to request "gravel" (low-value)
/// records or a summarize/count-only response.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParams {
    pub query_limit: Option<i64>,
    pub offset: Option<i64>,
    pub gravel: bool,
    pub summarize: bool,
}

/// A pluggable pDNS backend (§4.1). The core treats all backends as
/// interchangeable under this contract.
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;
    fn base_url(&self) -> &str;
    fn encap(&self) -> Encap;

    /// Builds the final request URL for one fetch.
    fn url(
        &self,
        qdesc: &QDesc,
        params: UrlParams,
        fence: Fence,
    ) -> Result<Url, BackendError>;

    /// Injects backend-specific authentication into an outgoing request.
    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
    }

    /// Maps an HTTP status code plus the first line of a non-2xx response
    /// body to a short status code string surfaced on the Query (§7).
    fn status(&self, http_status: u16, first_line: &str) -> String {
        if first_line.trim().is_empty() {
            format!("HTTP {http_status}")
        } else {
            first_line.trim().to_string()
        }
    }

    /// Rejects query shapes this backend cannot serve.
    fn verb_ok(&self, mode: Mode) -> Result<(), String>;

    /// Accepts one `(key, value)` configuration pair from `pdnsq-config`.
    fn setenv(&mut self, key: &str, value: &str) -> Result<(), String>;

    /// Validates that the backend has everything it needs (e.g. an API key).
    fn ready(&self) -> Result<(), String>;
}
