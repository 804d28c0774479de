//! Core domain types for pdnsq: the pDNS tuple/query/fetch model, name
//! transforms, sort-key derivation, and the SAF state machine.
//!
//! This crate contains pure domain types with no IO and no async. Everything
//! here can be used from any layer of the application.

pub mod asinfo;
pub mod deblock;
pub mod fence;
pub mod name;
pub mod qdesc;
pub mod qparam;
pub mod query;
pub mod saf;
pub mod sortkey;
pub mod tuple;

pub use deblock::Deblocker;
pub use fence::{Fence, compute_fence};
pub use name::{chomp, reverse_name};
pub use qdesc::{Mode, QDesc};
pub use qparam::QParam;
pub use query::{Encap, Fetch, Query};
pub use saf::{SafEnvelope, SafFramer, SafState};
pub use sortkey::{sortable_rdata, sortable_rrname};
pub use tuple::{ParseError, RData, SummaryRecord, Tuple, parse_summary, parse_tuple};
