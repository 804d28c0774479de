//! Query parameters (§3): the time/limit/behavior knobs attached to a Query.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QParam {
    pub after: Option<u64>,
    pub before: Option<u64>,
    pub query_limit: Option<i64>,
    pub output_limit: Option<i64>,
    pub offset: Option<i64>,
    pub complete: bool,
    pub gravel: bool,
    pub follow: bool,
    /// Request an aggregate count-only response instead of per-record
    /// output (§4.9 "summarize variants").
    pub summarize: bool,
}
