//! Concurrent multi-fetch engine (§4.2, C2).
//!
//! The spec's single-threaded libcurl-multi poll loop is replaced with
//! `tokio` tasks over a shared `reqwest::Client`: a [`tokio::sync::Semaphore`]
//! sized to `max_in_flight` stands in for `pump(target_jobs)`, and
//! [`ActiveGate`] reproduces the batch-verbose pause/resume protocol (§5) as
//! an async turnstile rather than a per-handle pause sentinel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use pdnsq_types::{
    Deblocker, Encap, Fetch, Query, SafEnvelope, SafState, SummaryRecord, Tuple, parse_summary,
    parse_tuple,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Notify, Semaphore, mpsc};

use pdnsq_backends::Backend;
use pdnsq_config::Batching;

/// Maximum bytes read from a non-2xx response body before giving up on
/// finding its first line.
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// `User-Agent` sent on every request, identifying this client the way
/// spec.md §4.2 requires ("user-agent headers").
const USER_AGENT: &str = concat!("pdnsq/", env!("CARGO_PKG_VERSION"));

/// Builds one GET request against `url`: the backend's auth hook (§4.1),
/// an `Accept` header matching its wire encapsulation, and a `User-Agent`
/// identifying this client (§4.2 `add`).
fn build_request(
    client: &reqwest::Client,
    backend: &dyn Backend,
    url: &str,
    encap: Encap,
) -> reqwest::RequestBuilder {
    let accept = match encap {
        Encap::Cof => "application/json",
        Encap::Saf => "application/x-ndjson",
    };
    backend
        .auth(client.get(url))
        .header(reqwest::header::ACCEPT, accept)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP {status}: {first_line}")]
    Http { status: u16, first_line: String },
    #[error("transfer failed: {0}")]
    Other(String),
}

impl TransferError {
    #[must_use]
    pub fn status_code(&self) -> String {
        match self {
            Self::Dns(_) => "dns-failure".to_string(),
            Self::Connect(_) => "connect-failure".to_string(),
            Self::Http { status, .. } => status.to_string(),
            Self::Other(_) => "other-failure".to_string(),
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_timeout() || err.is_request() {
            Self::Dns(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Outcome of running every Fetch belonging to one Query.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    /// Set when any fetch hit a transport error that was not an
    /// intentional `stopped` short-circuit (§4.2 `drain`).
    pub exit_bad: bool,
}

/// The batch-verbose single-active-query turnstile (§5).
///
/// At most one query id holds the gate; others park FIFO and are woken in
/// order as the holder releases.
#[derive(Debug, Default)]
pub struct ActiveGate {
    state: Mutex<GateState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct GateState {
    active: Option<u64>,
    waiters: VecDeque<u64>,
}

impl ActiveGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `id` becomes the active query, parking FIFO behind any
    /// earlier waiters.
    pub async fn acquire(&self, id: u64) {
        loop {
            {
                let mut state = self.state.lock().expect("gate mutex poisoned");
                if state.active.is_none() && state.waiters.front().is_none_or(|&w| w == id) {
                    state.active = Some(id);
                    if state.waiters.front() == Some(&id) {
                        state.waiters.pop_front();
                    }
                    return;
                }
                if !state.waiters.contains(&id) {
                    state.waiters.push_back(id);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Releases the active slot, waking the next parked query if any.
    pub fn release(&self, id: u64) {
        let mut state = self.state.lock().expect("gate mutex poisoned");
        if state.active == Some(id) {
            state.active = None;
        }
        drop(state);
        self.notify.notify_waiters();
    }
}

async fn read_capped_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Drives one in-flight GET to completion, sending each decoded record into
/// `tx` as the deblocker (C3) and, when applicable, the SAF framer (C4)
/// decide it is ready to present. Every fetch of a query runs as its own
/// task (see [`TransferEngine::run_query`]), so records are pushed through a
/// channel rather than handed to a shared `FnMut` that concurrent tasks
/// could not otherwise call without aliasing.
async fn run_fetch(
    request: reqwest::RequestBuilder,
    fetch: &mut Fetch,
    encap: Encap,
    follow: bool,
    tx: &UnboundedSender<Tuple>,
    stop_all: &AtomicBool,
) -> Result<(), TransferError> {
    let response = request.send().await?;
    fetch.http_status = Some(response.status().as_u16());

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = read_capped_body(response).await;
        let first_line = body.lines().next().unwrap_or_default().to_string();
        return Err(TransferError::Http { status, first_line });
    }

    let mut stream = response.bytes_stream();
    let mut deblocker = Deblocker::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for record in deblocker.push(&chunk) {
            if fetch.stopped || stop_all.load(Ordering::Relaxed) {
                fetch.stopped = true;
                if let Some(framer) = fetch.saf.as_mut() {
                    framer.force_we_limited();
                }
                replay_cname_buffer(fetch, tx);
                return Ok(());
            }
            let line = String::from_utf8_lossy(&record).into_owned();
            let terminal = process_record(fetch, encap, follow, &line, tx);
            if terminal {
                fetch.stopped = true;
                replay_cname_buffer(fetch, tx);
                return Ok(());
            }
        }
    }

    if let Some(framer) = fetch.saf.as_mut() {
        framer.on_eof();
    }
    replay_cname_buffer(fetch, tx);
    Ok(())
}

/// Flushes the buffered CNAME tuples (§3, §4.7) through `tx` in arrival
/// order once their fetch is done, rather than destroying them unseen.
fn replay_cname_buffer(fetch: &mut Fetch, tx: &UnboundedSender<Tuple>) {
    for tuple in fetch.cname_buffer.drain(..) {
        let _ = tx.send(tuple);
    }
}

/// Processes one deblocked line (C3 output) according to the backend's wire
/// encapsulation (§4.1), forwarding any decoded tuple to `tx`. Returns `true`
/// once a terminal SAF state has been reached, telling the caller to stop
/// reading this fetch; the output-limit guard (§4.8) is applied by the
/// consumer of `tx` instead, via the shared stop flag `run_fetch` checks.
fn route_tuple(fetch: &mut Fetch, follow: bool, tuple: Tuple, tx: &UnboundedSender<Tuple>) {
    if follow && tuple.rrtype.eq_ignore_ascii_case("CNAME") {
        fetch.cname_buffer.push(tuple);
    } else {
        let _ = tx.send(tuple);
    }
}

fn process_record(
    fetch: &mut Fetch,
    encap: Encap,
    follow: bool,
    line: &str,
    tx: &UnboundedSender<Tuple>,
) -> bool {
    match encap {
        Encap::Cof => {
            if line.is_empty() {
                return false;
            }
            match parse_tuple(line) {
                Ok(tuple) => {
                    route_tuple(fetch, follow, tuple, tx);
                    false
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed COF record");
                    false
                }
            }
        }
        Encap::Saf => {
            let Some(framer) = fetch.saf.as_mut() else {
                return false;
            };
            let envelope = match SafEnvelope::parse(line) {
                Ok(envelope) => envelope,
                Err(_) if line.is_empty() => SafEnvelope::default(),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed SAF envelope");
                    return false;
                }
            };
            if let Some(obj) = &envelope.obj {
                let payload = obj.to_string();
                match parse_tuple(&payload) {
                    Ok(tuple) => route_tuple(fetch, follow, tuple, tx),
                    Err(err) => tracing::warn!(%err, "skipping malformed SAF payload"),
                }
            }
            framer.advance(&envelope)
        }
    }
}

/// Maps a terminal SAF state to the `(status, is_failure)` pair surfaced as
/// the Query's visible status (§7 "SAF terminal"). `succeeded`/`limited`
/// aren't failures; `failed`/`missing` are; `we_limited` is our own
/// early-stop and never counts against `exit_bad` (§8 "output_limit is not
/// an error").
fn saf_terminal_status(state: SafState) -> (&'static str, bool) {
    match state {
        SafState::Succeeded => ("NOERROR", false),
        SafState::Limited => ("LIMITED", false),
        SafState::Failed => ("FAILED", true),
        SafState::Missing => ("MISSING", true),
        SafState::WeLimited => ("WELIMITED", false),
        SafState::Init | SafState::Begin | SafState::Ongoing => unreachable!("not terminal"),
    }
}

/// Fetches and parses a single `summarize`-mode response (§4.9): the backend
/// emits one line of aggregate counts instead of a stream of tuples, so this
/// bypasses the streaming engine (deblocker, SAF framer, channel fan-in)
/// entirely and just reads the whole (small) body.
pub async fn fetch_summary(
    client: &reqwest::Client,
    backend: &dyn Backend,
    url: &str,
    encap: Encap,
) -> Result<SummaryRecord, TransferError> {
    let response = build_request(client, backend, url, encap).send().await?;
    let status = response.status();
    if !status.is_success() {
        let first_line = read_capped_body(response).await.lines().next().unwrap_or_default().to_string();
        return Err(TransferError::Http { status: status.as_u16(), first_line });
    }
    let body = read_capped_body(response).await;

    let payload = match encap {
        Encap::Cof => body.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().to_string(),
        Encap::Saf => body
            .lines()
            .find_map(|line| SafEnvelope::parse(line).ok().and_then(|e| e.obj).map(|o| o.to_string()))
            .unwrap_or_default(),
    };

    parse_summary(&payload).map_err(|err| TransferError::Other(err.to_string()))
}

/// The concurrent multi-fetch engine: a shared client, a semaphore bounding
/// in-flight transfers, and the batch-verbose active-query gate.
pub struct TransferEngine {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    gate: ActiveGate,
}

impl TransferEngine {
    #[must_use]
    pub fn new(client: reqwest::Client, max_in_flight: usize) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            gate: ActiveGate::new(),
        }
    }

    /// Runs every Fetch in `query` concurrently, one `tokio` task per fetch
    /// bounded by the `max_in_flight` semaphore, applying the batch-verbose
    /// single-active invariant when `batching == Batching::Verbose`.
    /// `on_tuple` is invoked once per record decoded from any of the query's
    /// fetches, in whatever order the concurrent tasks produce them; it
    /// returns `true` once the caller's `output_limit` has been reached,
    /// which signals every in-flight fetch to stop (§4.8) without marking
    /// them transport failures.
    pub async fn run_query(
        &self,
        query_id: u64,
        query: &mut Query,
        backend: &dyn Backend,
        batching: Batching,
        mut on_tuple: impl FnMut(Tuple) -> bool,
    ) -> QueryOutcome {
        if matches!(batching, Batching::Verbose) {
            self.gate.acquire(query_id).await;
        }

        let encap = backend.encap();
        let follow = query.params.follow;
        let stop_all = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel::<Tuple>();

        let fetches = std::mem::take(&mut query.fetches);
        let handles: Vec<_> = fetches
            .into_iter()
            .map(|mut fetch| {
                let request = build_request(&self.client, backend, &fetch.url, encap);
                let semaphore = Arc::clone(&self.semaphore);
                let tx = tx.clone();
                let stop_all = Arc::clone(&stop_all);
                tokio::spawn(async move {
                    let permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                    let result = run_fetch(request, &mut fetch, encap, follow, &tx, &stop_all).await;
                    drop(permit);
                    (fetch, result)
                })
            })
            .collect();
        drop(tx);

        while let Some(tuple) = rx.recv().await {
            if on_tuple(tuple) {
                stop_all.store(true, Ordering::Relaxed);
            }
        }

        let mut outcome = QueryOutcome::default();
        for handle in handles {
            let (fetch, result) = handle.await.expect("fetch task panicked");
            if let Err(err) = &result {
                if !fetch.stopped {
                    outcome.exit_bad = true;
                    query.set_status_once(backend.status(fetch.http_status.unwrap_or(0), &err.to_string()), err.to_string());
                    tracing::warn!(%err, url = %fetch.url, "transfer failed");
                }
            } else if let Some(framer) = fetch.saf.as_ref() {
                if framer.state().is_terminal() {
                    let (status, is_failure) = saf_terminal_status(framer.state());
                    query.set_status_once(status, framer.message().unwrap_or_default());
                    if is_failure {
                        outcome.exit_bad = true;
                    }
                }
            }
            query.fetches.push(fetch);
        }

        if matches!(batching, Batching::Verbose) {
            self.gate.release(query_id);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn active_gate_serializes_two_queries() {
        let gate = Arc::new(ActiveGate::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let g1 = gate.clone();
        let o1 = order.clone();
        let t1 = tokio::spawn(async move {
            g1.acquire(1).await;
            o1.lock().unwrap().push(1);
            tokio::time::sleep(Duration::from_millis(20)).await;
            g1.release(1);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;

        let g2 = gate.clone();
        let o2 = order.clone();
        let t2 = tokio::spawn(async move {
            g2.acquire(2).await;
            o2.lock().unwrap().push(2);
            g2.release(2);
        });

        t1.await.unwrap();
        t2.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn process_record_cof_emits_tuple() {
        let mut fetch = Fetch::new("http://example", Encap::Cof);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let terminal = process_record(
            &mut fetch,
            Encap::Cof,
            false,
            r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":1}"#,
            &tx,
        );
        assert!(!terminal);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn process_record_saf_terminal_on_succeeded() {
        let mut fetch = Fetch::new("http://example", Encap::Saf);
        let (tx, mut rx) = mpsc::unbounded_channel();
        process_record(&mut fetch, Encap::Saf, false, r#"{"cond":"begin"}"#, &tx);
        process_record(
            &mut fetch,
            Encap::Saf,
            false,
            r#"{"obj":{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4"}}"#,
            &tx,
        );
        let terminal =
            process_record(&mut fetch, Encap::Saf, false, r#"{"cond":"succeeded","msg":"ok"}"#, &tx);
        assert!(terminal);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    /// §3/§4.7: when `follow` is in effect, CNAME tuples are buffered on the
    /// Fetch rather than routed immediately, so they can be replayed after
    /// the rest of the ANY-type response has been processed.
    #[test]
    fn follow_buffers_cname_instead_of_routing_immediately() {
        let mut fetch = Fetch::new("http://example", Encap::Cof);
        let (tx, mut rx) = mpsc::unbounded_channel();
        process_record(
            &mut fetch,
            Encap::Cof,
            true,
            r#"{"rrname":"a.","rrtype":"CNAME","rdata":"b."}"#,
            &tx,
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(fetch.cname_buffer.len(), 1);

        process_record(
            &mut fetch,
            Encap::Cof,
            true,
            r#"{"rrname":"b.","rrtype":"A","rdata":"1.2.3.4"}"#,
            &tx,
        );
        let routed = rx.try_recv().unwrap();
        assert_eq!(routed.rrtype, "A");

        replay_cname_buffer(&mut fetch, &tx);
        assert!(fetch.cname_buffer.is_empty());
        let replayed = rx.try_recv().unwrap();
        assert_eq!(replayed.rrtype, "CNAME");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fetch_summary_parses_single_cof_line() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/summarize"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"count":5,"num_results":5}"#,
            ))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/summarize", server.uri());
        let backend = pdnsq_backends::DnsdbV1::new();
        let summary = fetch_summary(&client, &backend, &url, Encap::Cof).await.unwrap();
        assert_eq!(summary.count, Some(5));
        assert_eq!(summary.num_results, Some(5));
    }

    #[tokio::test]
    async fn run_query_runs_fetches_concurrently_and_collects_all_tuples() {
        use pdnsq_backends::DnsdbV1;
        use pdnsq_types::{Fetch, Mode, QDesc, QParam, Query};

        // No real backend.ready() call is needed: run_query only uses
        // backend.encap()/backend.status(), both of which work unconfigured.
        let backend = DnsdbV1::new();
        let qdesc = QDesc::new(Mode::Rrset, "example.com");
        let mut query = Query::new("test", qdesc, QParam::default());
        // Two fetches against unreachable URLs: both should fail independently
        // without one blocking the other, and the engine should still collect
        // zero tuples and report exit_bad without deadlocking.
        query.fetches.push(Fetch::new("http://127.0.0.1:1/a", Encap::Cof));
        query.fetches.push(Fetch::new("http://127.0.0.1:1/b", Encap::Cof));

        let client = reqwest::Client::new();
        let engine = TransferEngine::new(client, 2);
        let mut seen = Vec::new();
        let outcome = engine
            .run_query(0, &mut query, &backend, Batching::None, |t| {
                seen.push(t);
                false
            })
            .await;

        assert!(outcome.exit_bad);
        assert!(seen.is_empty());
        assert_eq!(query.fetches.len(), 2);
    }

    /// §8 scenario S2: a SAF stream that reaches `succeeded` presents its one
    /// tuple and leaves `NOERROR (ok)` as the query's visible status.
    #[tokio::test]
    async fn saf_succeeded_sets_noerror_status() {
        use pdnsq_backends::DnsdbV2;
        use pdnsq_types::{Mode, QDesc, QParam};
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = concat!(
            "{\"cond\":\"begin\"}\n",
            "{\"obj\":{\"rrname\":\"a.example.\",\"rrtype\":\"A\",\"rdata\":\"1.2.3.4\"}}\n",
            "{\"cond\":\"succeeded\",\"msg\":\"ok\"}\n",
        );
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let backend = DnsdbV2::new();
        let qdesc = QDesc::new(Mode::Rrset, "a.example.com");
        let mut query = Query::new("test", qdesc, QParam::default());
        query.fetches.push(Fetch::new(server.uri(), Encap::Saf));

        let client = reqwest::Client::new();
        let engine = TransferEngine::new(client, 1);
        let mut seen = Vec::new();
        let outcome = engine
            .run_query(0, &mut query, &backend, Batching::None, |t| {
                seen.push(t);
                false
            })
            .await;

        assert!(!outcome.exit_bad);
        assert_eq!(seen.len(), 1);
        assert_eq!(query.status, Some(("NOERROR".to_string(), "ok".to_string())));
    }

    /// §8 scenario S3: a SAF stream that ends after `begin` only (no
    /// terminator) surfaces `missing` with the synthesized message and
    /// marks the outcome as a failure.
    #[tokio::test]
    async fn saf_missing_terminator_marks_exit_bad() {
        use pdnsq_backends::DnsdbV2;
        use pdnsq_types::{Mode, QDesc, QParam};
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"cond\":\"begin\"}\n"))
            .mount(&server)
            .await;

        let backend = DnsdbV2::new();
        let qdesc = QDesc::new(Mode::Rrset, "a.example.com");
        let mut query = Query::new("test", qdesc, QParam::default());
        query.fetches.push(Fetch::new(server.uri(), Encap::Saf));

        let client = reqwest::Client::new();
        let engine = TransferEngine::new(client, 1);
        let outcome = engine
            .run_query(0, &mut query, &backend, Batching::None, |_| false)
            .await;

        assert!(outcome.exit_bad);
        let (status, message) = query.status.expect("status set");
        assert_eq!(status, "MISSING");
        assert!(message.contains("No SAF terminator"));
    }
}
