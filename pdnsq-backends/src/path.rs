//! Canonical REST-like path construction shared by all backends (§4.1).

use pdnsq_types::{Mode, QDesc};

#[must_use]
pub fn canonical_path(qdesc: &QDesc) -> String {
    let rrtype = qdesc.rrtype.as_ref().and_then(|types| types.first());
    match qdesc.mode {
        Mode::Rrset => {
            let mut path = format!("rrset/name/{}", qdesc.thing);
            if let Some(rr) = rrtype {
                path.push('/');
                path.push_str(rr);
                if let Some(bailiwick) = &qdesc.bailiwick {
                    path.push('/');
                    path.push_str(bailiwick);
                }
            }
            path
        }
        Mode::RawRrset => {
            let mut path = format!("rrset/raw/{}", qdesc.thing);
            if let Some(rr) = rrtype {
                path.push('/');
                path.push_str(rr);
            }
            path
        }
        Mode::Name => {
            let mut path = format!("rdata/name/{}", qdesc.thing);
            if let Some(rr) = rrtype {
                path.push('/');
                path.push_str(rr);
            }
            path
        }
        Mode::Ip => {
            let mut path = format!("rdata/ip/{}", qdesc.thing);
            if let Some(pfxlen) = qdesc.pfxlen {
                path.push('/');
                path.push_str(&pfxlen.to_string());
            }
            path
        }
        Mode::RawName => {
            let mut path = format!("rdata/raw/{}", qdesc.thing);
            if let Some(rr) = rrtype {
                path.push('/');
                path.push_str(rr);
            }
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrset_with_type_and_bailiwick() {
        let q = QDesc::new(Mode::Rrset, "www.example.com")
            .with_rrtype(vec!["A".to_string()])
            .with_bailiwick("example.com.");
        assert_eq!(
            canonical_path(&q),
            "rrset/name/www.example.com/A/example.com."
        );
    }

    #[test]
    fn ip_with_pfxlen() {
        let q = QDesc::new(Mode::Ip, "8.8.8.0").with_pfxlen(24);
        assert_eq!(canonical_path(&q), "rdata/ip/8.8.8.0/24");
    }

    #[test]
    fn name_without_type() {
        let q = QDesc::new(Mode::Name, "example.com");
        assert_eq!(canonical_path(&q), "rdata/name/example.com");
    }
}
