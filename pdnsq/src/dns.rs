//! IP-family pin (`--ipv4`/`--ipv6`, `curl_ipresolve` in spec.md §6): a
//! `reqwest::dns::Resolve` that filters the system resolver's answers down
//! to one address family, standing in for `CURLOPT_IPRESOLVE`.

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Any,
    V4Only,
    V6Only,
}

impl Family {
    #[must_use]
    pub fn from_flags(ipv4: bool, ipv6: bool) -> Self {
        match (ipv4, ipv6) {
            (true, false) => Family::V4Only,
            (false, true) => Family::V6Only,
            _ => Family::Any,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FamilyPinnedResolver {
    family: Family,
}

impl FamilyPinnedResolver {
    #[must_use]
    pub fn new(family: Family) -> Self {
        Self { family }
    }
}

impl Resolve for FamilyPinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let family = self.family;
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), 0)).await?;
            let filtered: Vec<_> = addrs
                .filter(|addr| match family {
                    Family::Any => true,
                    Family::V4Only => addr.is_ipv4(),
                    Family::V6Only => addr.is_ipv6(),
                })
                .collect();
            let iter: Addrs = Box::new(filtered.into_iter());
            Ok(iter)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flags_picks_the_set_family() {
        assert_eq!(Family::from_flags(true, false), Family::V4Only);
        assert_eq!(Family::from_flags(false, true), Family::V6Only);
        assert_eq!(Family::from_flags(false, false), Family::Any);
    }
}
