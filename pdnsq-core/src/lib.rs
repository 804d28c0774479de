//! The fetch/assembly/render pipeline (C2–C9): transfer engine, SAF framer
//! wiring, query orchestrator, sort/writer stage, and presenter.
//!
//! `pdnsq-types` supplies the pure data model this crate drives; IO lives
//! here. `pdnsq-backends` supplies the `Backend` capability this crate
//! dispatches fetches through.

#[cfg(feature = "asinfo")]
pub mod asinfo;
pub mod orchestrator;
pub mod presenter;
pub mod sort;
pub mod transfer;
pub mod writer;

pub use orchestrator::build_query;
pub use presenter::OutputFormat;
pub use transfer::{ActiveGate, QueryOutcome, TransferEngine, TransferError, fetch_summary};
pub use writer::Writer;

use pdnsq_backends::Backend;
use pdnsq_config::Batching;
use pdnsq_types::{Query, Tuple};

/// Runs one Query end to end: dispatches its fetches through the transfer
/// engine, presenting each decoded tuple through `on_tuple` as it arrives.
/// Direct-to-stdout (non-sorted) Writers call this per query; the sorted
/// path instead buffers [`crate::sort::sort_line`] output for the
/// [`crate::sort::SortPipeline`] and replays it through the presenter on
/// readback.
///
/// `on_tuple` returns `true` once `output_limit` has been reached (§4.8);
/// the engine stops the fetch that produced it without counting it as a
/// transport failure.
pub async fn run_query(
    engine: &TransferEngine,
    query_id: u64,
    query: &mut Query,
    backend: &dyn Backend,
    batching: Batching,
    on_tuple: impl FnMut(Tuple) -> bool,
) -> QueryOutcome {
    engine.run_query(query_id, query, backend, batching, on_tuple).await
}
