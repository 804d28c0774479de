//! Query / Fetch data model (§3): the owning tree `Writer -> Query -> Fetch`.
//! `pdnsq-core` owns the mutation of these structures as fetch tasks report
//! events back to the orchestrator.

use crate::qdesc::QDesc;
use crate::qparam::QParam;
use crate::saf::SafFramer;
use crate::tuple::Tuple;

/// The wire encapsulation a backend declares (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encap {
    /// One JSON object per line; the object is the payload.
    Cof,
    /// One JSON object per line, payload wrapped `{cond?, msg?, obj?}`.
    Saf,
}

/// One outstanding HTTP GET bound to a Query (§3).
#[derive(Debug, Clone)]
pub struct Fetch {
    pub url: String,
    pub http_status: Option<u16>,
    /// `Some` only for SAF-encapsulated backends.
    pub saf: Option<SafFramer>,
    /// Distinguishes limit-induced early termination from a real transport error.
    pub stopped: bool,
    /// Buffered CNAME tuples awaiting end-of-fetch replay, when `follow` is set.
    pub cname_buffer: Vec<Tuple>,
}

impl Fetch {
    #[must_use]
    pub fn new(url: impl Into<String>, encap: Encap) -> Self {
        Self {
            url: url.into(),
            http_status: None,
            saf: matches!(encap, Encap::Saf).then(SafFramer::new),
            stopped: false,
            cname_buffer: Vec::new(),
        }
    }
}

/// A user-visible query, owning one or more [`Fetch`]es (§3).
#[derive(Debug, Clone)]
pub struct Query {
    pub description: String,
    pub params: QParam,
    pub qdesc: QDesc,
    pub fetches: Vec<Fetch>,
    /// Final query-level status/message, set at most once (§3, §7).
    pub status: Option<(String, String)>,
    pub multitype: bool,
}

impl Query {
    #[must_use]
    pub fn new(description: impl Into<String>, qdesc: QDesc, params: QParam) -> Self {
        Self {
            description: description.into(),
            params,
            qdesc,
            fetches: Vec::new(),
            status: None,
            multitype: false,
        }
    }

    /// Records the query's first-seen HTTP/SAF status. Subsequent calls are
    /// no-ops — the first recorded status wins (§7).
    pub fn set_status_once(&mut self, status: impl Into<String>, message: impl Into<String>) {
        if self.status.is_none() {
            self.status = Some((status.into(), message.into()));
        }
    }

    #[must_use]
    pub fn all_fetches_done(&self) -> bool {
        self.fetches.iter().all(|f| f.stopped)
    }
}
