//! CIRCL passive DNS backend: COF encapsulation, HTTP Basic auth. CIRCL has
//! no `offset`/rate-limit support and no raw/hex endpoint.

use pdnsq_types::{Encap, Fence, Mode, QDesc};
use url::Url;

use crate::{Backend, BackendError, UrlParams, path::canonical_path};

const DEFAULT_BASE_URL: &str = "https://www.circl.lu/pdns/query";

#[derive(Debug, Default)]
pub struct Circl {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl Circl {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
        }
    }
}

impl Backend for Circl {
    fn name(&self) -> &str {
        "circl"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encap(&self) -> Encap {
        Encap::Cof
    }

    fn url(&self, qdesc: &QDesc, _params: UrlParams, fence: Fence) -> Result<Url, BackendError> {
        self.verb_ok(qdesc.mode)
            .map_err(|detail| BackendError::UnsupportedQuery {
                system: self.name().to_string(),
                detail,
            })?;
        let path = canonical_path(qdesc);
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))?;
        // CIRCL has no offset/rate-limit knobs; only the time fence applies.
        let mut pairs = url.query_pairs_mut();
        if let Some(v) = fence.first_after {
            pairs.append_pair("time_first_after", &v.to_string());
        }
        if let Some(v) = fence.last_before {
            pairs.append_pair("time_last_before", &v.to_string());
        }
        drop(pairs);
        Ok(url)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => builder.basic_auth(user, Some(pass)),
            _ => builder,
        }
    }

    fn verb_ok(&self, mode: Mode) -> Result<(), String> {
        match mode {
            Mode::RawRrset | Mode::RawName => {
                Err("circl: raw/hex queries are not supported".to_string())
            }
            _ => Ok(()),
        }
    }

    fn setenv(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "username" => {
                self.username = Some(value.to_string());
                Ok(())
            }
            "password" => {
                self.password = Some(value.to_string());
                Ok(())
            }
            "server" | "base_url" => {
                self.base_url = value.trim_end_matches('/').to_string();
                Ok(())
            }
            _ => Err(format!("circl: unknown configuration key {key:?}")),
        }
    }

    fn ready(&self) -> Result<(), String> {
        if self.username.is_some() && self.password.is_some() {
            Ok(())
        } else {
            Err("circl: username/password not configured".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdnsq_types::Mode;

    #[test]
    fn rejects_raw_queries() {
        let backend = Circl::new();
        assert!(backend.verb_ok(Mode::RawRrset).is_err());
        assert!(backend.verb_ok(Mode::Rrset).is_ok());
    }

    #[test]
    fn url_rejects_raw_rrset() {
        let backend = Circl::new();
        let qdesc = QDesc::new(Mode::RawRrset, "deadbeef");
        assert!(backend.url(&qdesc, UrlParams::default(), Fence::default()).is_err());
    }

    #[test]
    fn ready_requires_basic_auth_creds() {
        let mut backend = Circl::new();
        assert!(backend.ready().is_err());
        backend.setenv("username", "u").unwrap();
        backend.setenv("password", "p").unwrap();
        assert!(backend.ready().is_ok());
    }
}
