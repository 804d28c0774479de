//! Query descriptor (§3 `qdesc`): the shape of a user-visible query.

/// The mode of a query, selecting which REST-like path family the backend
/// builds (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `rrset/name/NAME[/TYPE[/BAILIWICK]]`
    Rrset,
    /// `rrset/raw/HEX[/TYPE]`
    RawRrset,
    /// `rdata/name/NAME[/TYPE]`
    Name,
    /// `rdata/ip/ADDR[/PFXLEN]`
    Ip,
    /// `rdata/raw/HEX[/TYPE]`
    RawName,
}

/// A fully-specified query shape, independent of time/limit parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QDesc {
    pub mode: Mode,
    pub thing: String,
    pub rrtype: Option<Vec<String>>,
    pub bailiwick: Option<String>,
    pub pfxlen: Option<u8>,
}

impl QDesc {
    #[must_use]
    pub fn new(mode: Mode, thing: impl Into<String>) -> Self {
        Self {
            mode,
            thing: thing.into(),
            rrtype: None,
            bailiwick: None,
            pfxlen: None,
        }
    }

    #[must_use]
    pub fn with_rrtype(mut self, rrtype: Vec<String>) -> Self {
        self.rrtype = if rrtype.is_empty() { None } else { Some(rrtype) };
        self
    }

    #[must_use]
    pub fn with_bailiwick(mut self, bailiwick: impl Into<String>) -> Self {
        self.bailiwick = Some(bailiwick.into());
        self
    }

    #[must_use]
    pub fn with_pfxlen(mut self, pfxlen: u8) -> Self {
        self.pfxlen = Some(pfxlen);
        self
    }
}
