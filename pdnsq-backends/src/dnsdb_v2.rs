//! DNSDB v2 backend: SAF encapsulation, `X-Api-Key` auth, client identity
//! query parameters.

use pdnsq_types::{Encap, Fence, Mode, QDesc};
use url::Url;

use crate::{Backend, BackendError, UrlParams, path::canonical_path};

const DEFAULT_BASE_URL: &str = "https://api.dnsdb.info/dnsdb/v2";
const SWCLIENT: &str = "pdnsq";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
pub struct DnsdbV2 {
    base_url: String,
    api_key: Option<String>,
}

impl DnsdbV2 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }

    fn append_fence(url: &mut Url, fence: Fence) {
        let mut pairs = url.query_pairs_mut();
        if let Some(v) = fence.first_after {
            pairs.append_pair("time_first_after", &v.to_string());
        }
        if let Some(v) = fence.last_before {
            pairs.append_pair("time_last_before", &v.to_string());
        }
        if let Some(v) = fence.last_after {
            pairs.append_pair("time_last_after", &v.to_string());
        }
        if let Some(v) = fence.first_before {
            pairs.append_pair("time_first_before", &v.to_string());
        }
    }
}

impl Backend for DnsdbV2 {
    fn name(&self) -> &str {
        "dnsdb2"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encap(&self) -> Encap {
        Encap::Saf
    }

    fn url(&self, qdesc: &QDesc, params: UrlParams, fence: Fence) -> Result<Url, BackendError> {
        let path = canonical_path(qdesc);
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))?;
        Self::append_fence(&mut url, fence);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(limit) = params.query_limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = params.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
            if params.gravel {
                pairs.append_pair("gravel", "true");
            }
            if params.summarize {
                pairs.append_pair("summarize", "true");
            }
            pairs.append_pair("swclient", SWCLIENT);
            pairs.append_pair("version", VERSION);
        }
        Ok(url)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("X-Api-Key", key),
            None => builder,
        }
    }

    fn verb_ok(&self, _mode: Mode) -> Result<(), String> {
        Ok(())
    }

    fn setenv(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "apikey" | "api_key" => {
                self.api_key = Some(value.to_string());
                Ok(())
            }
            "server" | "base_url" => {
                self.base_url = value.trim_end_matches('/').to_string();
                Ok(())
            }
            _ => Err(format!("dnsdb2: unknown configuration key {key:?}")),
        }
    }

    fn ready(&self) -> Result<(), String> {
        if self.api_key.is_some() {
            Ok(())
        } else {
            Err("dnsdb2: no API key configured".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdnsq_types::Mode;

    #[test]
    fn url_includes_client_identity() {
        let mut backend = DnsdbV2::new();
        backend.setenv("apikey", "secret").unwrap();
        let qdesc = QDesc::new(Mode::Ip, "8.8.8.8");
        let url = backend
            .url(&qdesc, UrlParams::default(), Fence::default())
            .unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("swclient=pdnsq"));
        assert!(query.contains("version="));
    }

    #[test]
    fn encap_is_saf() {
        assert_eq!(DnsdbV2::new().encap(), Encap::Saf);
    }
}
