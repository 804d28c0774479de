//! DNSDB v1 backend: COF encapsulation, `X-Api-Key` auth.

use pdnsq_types::{Encap, Fence, Mode, QDesc};
use url::Url;

use crate::{Backend, BackendError, UrlParams, path::canonical_path};

const DEFAULT_BASE_URL: &str = "https://api.dnsdb.info/lookup";

#[derive(Debug, Default)]
pub struct DnsdbV1 {
    base_url: String,
    api_key: Option<String>,
}

impl DnsdbV1 {
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

impl Backend for DnsdbV1 {
    fn name(&self) -> &str {
        "dnsdb1"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encap(&self) -> Encap {
        Encap::Cof
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
            if params.gravel {
                pairs.append_pair("gravel", "true");
            }
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
            _ => Err(format!("dnsdb1: unknown configuration key {key:?}")),
        }
    }

    fn ready(&self) -> Result<(), String> {
        if self.api_key.is_some() {
            Ok(())
        } else {
            Err("dnsdb1: no API key configured".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdnsq_types::Mode;

    #[test]
    fn url_embeds_fence_and_limit() {
        let mut backend = DnsdbV1::new();
        backend.setenv("apikey", "secret").unwrap();
        let qdesc = QDesc::new(Mode::Rrset, "www.example.com").with_rrtype(vec!["A".to_string()]);
        let fence = Fence {
            first_after: Some(100),
            last_before: Some(200),
            ..Fence::default()
        };
        let url = backend
            .url(&qdesc, UrlParams { query_limit: Some(10), ..UrlParams::default() }, fence)
            .unwrap();
        assert!(url.as_str().starts_with(DEFAULT_BASE_URL));
        assert!(url.path().ends_with("/rrset/name/www.example.com/A"));
        let query = url.query().unwrap();
        assert!(query.contains("time_first_after=100"));
        assert!(query.contains("time_last_before=200"));
        assert!(query.contains("limit=10"));
    }

    #[test]
    fn ready_requires_api_key() {
        let backend = DnsdbV1::new();
        assert!(backend.ready().is_err());
    }
}
