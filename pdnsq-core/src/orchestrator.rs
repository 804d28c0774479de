//! Query orchestrator (§4.7, C7): expands one user query into one or more
//! fetches (rrtype fan-out, follow-CNAME), and computes the time fence.

use pdnsq_backends::{Backend, BackendError, UrlParams};
use pdnsq_types::{Fetch, Query, QDesc, QParam, compute_fence};

/// The rrtype fan-out rule (§4.7):
/// - `follow` set: one fetch, rrtype forced to `ANY`.
/// - empty/absent rrtype list: one fetch, backend picks the default.
/// - otherwise: one fetch per rrtype.
fn fetch_variants(qdesc: &QDesc, follow: bool) -> Vec<QDesc> {
    if follow {
        return vec![qdesc.clone().with_rrtype(vec!["ANY".to_string()])];
    }
    match &qdesc.rrtype {
        None => vec![qdesc.clone()],
        Some(types) if types.is_empty() => vec![qdesc.clone()],
        Some(types) => types
            .iter()
            .map(|t| qdesc.clone().with_rrtype(vec![t.clone()]))
            .collect(),
    }
}

/// Builds a [`Query`] with one [`Fetch`] per effective rrtype, against the
/// given backend. The time fence (§4.7) is computed once and passed to every
/// fetch's URL.
pub fn build_query(
    backend: &dyn Backend,
    description: impl Into<String>,
    qdesc: QDesc,
    params: QParam,
) -> Result<Query, BackendError> {
    let mut query = Query::new(description, qdesc.clone(), params);
    let fence = compute_fence(&params);
    let variants = fetch_variants(&qdesc, params.follow);
    query.multitype = variants.len() > 1;

    let url_params = UrlParams {
        query_limit: params.query_limit,
        offset: params.offset,
        gravel: params.gravel,
        summarize: params.summarize,
    };

    for variant in &variants {
        let url = backend.url(variant, url_params, fence)?;
        query.fetches.push(Fetch::new(url.to_string(), backend.encap()));
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdnsq_backends::DnsdbV1;
    use pdnsq_types::Mode;

    fn backend() -> DnsdbV1 {
        let mut b = DnsdbV1::new();
        b.setenv("apikey", "x").unwrap();
        b
    }

    #[test]
    fn follow_forces_single_any_fetch() {
        let backend = backend();
        let qdesc = QDesc::new(Mode::Rrset, "example.com")
            .with_rrtype(vec!["A".to_string(), "NS".to_string()]);
        let params = QParam { follow: true, ..QParam::default() };
        let query = build_query(&backend, "test", qdesc, params).unwrap();
        assert_eq!(query.fetches.len(), 1);
        assert!(query.fetches[0].url.contains("/ANY"));
        assert!(!query.multitype);
    }

    #[test]
    fn empty_rrtype_list_yields_one_fetch() {
        let backend = backend();
        let qdesc = QDesc::new(Mode::Rrset, "example.com");
        let query = build_query(&backend, "test", qdesc, QParam::default()).unwrap();
        assert_eq!(query.fetches.len(), 1);
    }

    #[test]
    fn multiple_rrtypes_fan_out_and_mark_multitype() {
        let backend = backend();
        let qdesc = QDesc::new(Mode::Rrset, "example.com")
            .with_rrtype(vec!["A".to_string(), "AAAA".to_string()]);
        let query = build_query(&backend, "test", qdesc, QParam::default()).unwrap();
        assert_eq!(query.fetches.len(), 2);
        assert!(query.multitype);
    }

    #[test]
    fn fence_is_embedded_in_fetch_urls() {
        let backend = backend();
        let qdesc = QDesc::new(Mode::Rrset, "example.com");
        let params = QParam {
            after: Some(100),
            before: Some(200),
            complete: true,
            ..QParam::default()
        };
        let query = build_query(&backend, "test", qdesc, params).unwrap();
        assert!(query.fetches[0].url.contains("time_first_after=100"));
        assert!(query.fetches[0].url.contains("time_last_before=200"));
    }
}
