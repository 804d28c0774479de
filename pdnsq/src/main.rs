//! pdnsq - command-line client for passive-DNS (pDNS) query services.
//!
//! Wires argument parsing (`args`), the batch-file front end (`batch`),
//! configuration loading (`pdnsq_config`), a concrete `Backend`
//! (`pdnsq_backends`), and the fetch/assembly/render pipeline (`pdnsq_core`)
//! together, then maps the outcome to a process exit code (§6 "Exit codes").

mod args;
mod batch;
mod dns;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::Args;
use batch::BatchEntry;
use dns::{Family, FamilyPinnedResolver};
use pdnsq_backends::{Backend, Circl, DnsdbV1, DnsdbV2};
use pdnsq_config::{Batching, Config, Sorting};
use pdnsq_core::presenter::{
    Annotation, QueryDetail, render_summary_csv, render_summary_json, render_summary_text,
    summary_csv_header,
};
use pdnsq_core::sort::{SortKey, SortPipeline, SortSpec, sort_line, sort_line_payload};
use pdnsq_core::{OutputFormat, TransferEngine, Writer};
use pdnsq_types::{QDesc, QParam, Tuple, parse_tuple};

fn init_tracing(debug_level: u8) {
    let default_directive = match debug_level {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn build_backend(name: &str, config: &Config) -> Result<Box<dyn Backend>> {
    let mut backend: Box<dyn Backend> = match name {
        "dnsdb1" => Box::new(DnsdbV1::new()),
        "dnsdb2" => Box::new(DnsdbV2::new()),
        "circl" => Box::new(Circl::new()),
        other => bail!("unknown backend system {other:?}"),
    };

    for (_, key, value) in config.triples_for(name) {
        backend
            .setenv(&key, &value)
            .map_err(|detail| anyhow::anyhow!("{detail}"))?;
    }

    backend
        .ready()
        .map_err(|detail| anyhow::anyhow!("{detail}"))?;
    Ok(backend)
}

fn build_client(args: &Args) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(args.insecure);
    let family = Family::from_flags(args.ipv4, args.ipv6);
    if family != Family::Any {
        builder = builder.dns_resolver(Arc::new(FamilyPinnedResolver::new(family)));
    }
    builder.build().context("building HTTP client")
}

/// Applies the `--reverse`/`--chomp` name transforms (§4.5, §6) to a tuple's
/// `rrname` before presentation. `reverse_name` runs first when both are
/// set, so `chomp` sees (and strips) the leading-dot artifact it leaves
/// behind rather than a trailing one.
fn apply_name_transforms(mut tuple: Tuple, args: &Args) -> Tuple {
    if args.reverse {
        tuple.rrname = pdnsq_types::reverse_name(&tuple.rrname);
        if args.chomp {
            tuple.rrname = pdnsq_types::chomp(&tuple.rrname, true);
        }
    } else if args.chomp {
        tuple.rrname = pdnsq_types::chomp(&tuple.rrname, false);
    }
    tuple
}

/// Looks up AS-info for every IPv4 rdata value of an `A` tuple (§4.6). Other
/// rrtypes have no applicable lookup and get no annotations.
async fn annotate(tuple: &Tuple, zone: &str) -> Vec<Annotation> {
    if tuple.rrtype != "A" {
        return Vec::new();
    }
    let mut out = Vec::new();
    for value in tuple.rdata.values() {
        let asinfo = match value.parse() {
            Ok(addr) => pdnsq_core::asinfo::lookup_v4(addr, zone).await.ok(),
            Err(_) => None,
        };
        out.push(Annotation { asinfo });
    }
    out
}

/// Pipes buffered tuples through `sort(1)` (§4.8, C8) and re-parses the
/// deduped, ordered result. `SortKey::all()` is always registered so `-u`
/// dedups on every column, matching the core's sort-stage contract.
///
/// `remaining` is the caller's output-limit budget left over after the
/// un-sorted tuples already presented this run. Once readback has produced
/// that many tuples there's no reason to keep reading: §4.8 has the reader
/// SIGTERM the subprocess and drain whatever it still has buffered, rather
/// than blocking on the rest of a sort that can no longer affect the result.
async fn sort_tuples(tuples: Vec<Tuple>, sorting: Sorting, remaining: Option<i64>) -> Result<Vec<Tuple>> {
    if tuples.is_empty() || matches!(sorting, Sorting::NoSort) {
        return Ok(tuples);
    }
    if remaining == Some(0) {
        return Ok(Vec::new());
    }
    let reverse = matches!(sorting, Sorting::ReverseSort);
    let specs: Vec<SortSpec> =
        SortKey::all().into_iter().map(|key| SortSpec { key, reverse }).collect();

    let mut pipeline = SortPipeline::spawn(&specs).context("spawning sort(1)")?;
    for tuple in &tuples {
        pipeline
            .write_line(&sort_line(tuple))
            .await
            .context("writing to sort(1)")?;
    }
    pipeline.close_stdin().await;

    let mut out = Vec::with_capacity(tuples.len());
    while let Some(line) = pipeline.read_line().await.context("reading from sort(1)")? {
        if let Some(payload) = sort_line_payload(&line) {
            if let Ok(tuple) = parse_tuple(payload) {
                out.push(tuple);
                if remaining.is_some_and(|limit| out.len() as i64 >= limit) {
                    pipeline.terminate();
                    break;
                }
            }
        }
    }
    // Drain whatever sort(1) still has queued so it can exit after SIGTERM
    // instead of blocking on a full stdout pipe; a no-op once already at EOF.
    while pipeline.read_line().await.context("draining sort(1) output")?.is_some() {}
    Ok(out)
}

/// Runs one query end to end against `backend`: dispatches through the
/// transfer engine, optionally buffers for the external sort and/or
/// AS-info annotation (both require work `on_tuple`, a synchronous
/// callback, cannot do inline), then presents each resulting tuple.
async fn run_one_query(
    engine: &TransferEngine,
    query_id: u64,
    backend: &dyn Backend,
    description: String,
    qdesc: QDesc,
    params: QParam,
    args: &Args,
    writer: &mut Writer,
    client: &reqwest::Client,
) -> Result<bool> {
    let mode = qdesc.mode;
    let mut query =
        pdnsq_core::build_query(backend, description.clone(), qdesc, params).context("building query")?;

    if params.summarize {
        let url = query
            .fetches
            .first()
            .map(|fetch| fetch.url.clone())
            .context("summarize query produced no fetch")?;
        let summary = pdnsq_core::fetch_summary(client, backend, &url, backend.encap())
            .await
            .context("fetching summarize response")?;
        let time_format = pdnsq_config::TimeFormat::default();
        let line = match args.format {
            args::FormatArg::Json => render_summary_json(&summary, time_format, args.datefix),
            args::FormatArg::Csv => {
                format!("{}\n{}", summary_csv_header(), render_summary_csv(&summary))
            }
            _ => render_summary_text(&summary, time_format),
        };
        println!("{line}");
        return Ok(true);
    }

    let detail = QueryDetail::new(&description, &params);
    let needs_buffering = args.sort.is_some() || args.asinfo;

    let outcome = if needs_buffering {
        let mut buffered = Vec::new();
        let outcome = pdnsq_core::run_query(engine, query_id, &mut query, backend, args.batch.into(), |tuple| {
            buffered.push(tuple);
            false
        })
        .await;

        let mut tuples = buffered;
        if let Some(sorting) = args.sort {
            let remaining = args.output_limit.map(|limit| (limit - writer.emitted()).max(0));
            tuples = sort_tuples(tuples, sorting.into(), remaining).await?;
        }
        for tuple in tuples {
            let tuple = apply_name_transforms(tuple, args);
            let annotations = if args.asinfo { annotate(&tuple, &args.asinfo_domain).await } else { Vec::new() };
            let present = writer.present(&tuple, mode, Some(&detail), &annotations);
            for line in present.lines {
                println!("{line}");
            }
            if present.limit_reached {
                break;
            }
        }
        outcome
    } else {
        pdnsq_core::run_query(engine, query_id, &mut query, backend, args.batch.into(), |tuple| {
            let tuple = apply_name_transforms(tuple, args);
            let present = writer.present(&tuple, mode, Some(&detail), &[]);
            for line in present.lines {
                println!("{line}");
            }
            present.limit_reached
        })
        .await
    };

    if let Some((status, message)) = &query.status {
        writer.push_postscript(status, message);
    }
    Ok(!outcome.exit_bad)
}

fn params_from_args(args: &Args) -> QParam {
    QParam {
        after: args.after,
        before: args.before,
        query_limit: args.query_limit,
        output_limit: args.output_limit,
        offset: args.offset,
        complete: args.complete,
        gravel: args.gravel,
        follow: args.follow,
        summarize: args.summarize,
    }
}

async fn run(args: Args) -> Result<bool> {
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    let system = args
        .system
        .clone()
        .or_else(|| config.default_system.clone())
        .context("no backend system selected (pass --system or set default_system)")?;
    let backend = build_backend(&system, &config)?;

    let client = build_client(&args)?;
    let engine = TransferEngine::new(client.clone(), args.max_in_flight);

    let format: OutputFormat = args.format.into();
    let params = params_from_args(&args);

    // One Writer spans every query in the run (§3: it "collects the output
    // of one or more queries"), so the minimal-mode dedup set, CSV header
    // flag, and output-limit counter are shared across a whole batch file
    // rather than reset per line.
    let mut writer = Writer::new(
        format,
        args.output_limit,
        config.knobs.time_format,
        args.datefix,
        args.asinfo,
        args.qdetail,
    );
    let mut postscript_printed = 0;
    let mut flush_postscript = |writer: &Writer, quiet: bool| {
        if !quiet {
            for line in &writer.postscript()[postscript_printed..] {
                eprintln!("{line}");
            }
        }
        postscript_printed = writer.postscript().len();
    };

    if let Some(batch_file) = &args.batch_file {
        let contents = std::fs::read_to_string(batch_file)
            .with_context(|| format!("reading batch file {}", batch_file.display()))?;
        let entries: Vec<BatchEntry> = batch::parse_batch(&contents).context("parsing batch file")?;

        let mut all_ok = true;
        for (query_id, entry) in entries.into_iter().enumerate() {
            if matches!(args.batch.into(), Batching::Verbose) {
                println!("++ batch line {}", entry.line);
            }
            let ok = run_one_query(
                &engine,
                query_id as u64,
                backend.as_ref(),
                format!("batch line {}", entry.line),
                entry.qdesc,
                params,
                &args,
                &mut writer,
                &client,
            )
            .await?;
            all_ok = all_ok && ok;
            flush_postscript(&writer, args.quiet);
        }
        return Ok(all_ok);
    }

    let qdesc = args::qdesc_from_args(&args).context("no query specified")?;
    let ok = run_one_query(
        &engine,
        0,
        backend.as_ref(),
        "pdnsq query".to_string(),
        qdesc,
        params,
        &args,
        &mut writer,
        &client,
    )
    .await?;
    flush_postscript(&writer, args.quiet);
    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(%err, "fatal error");
            eprintln!("pdnsq: {err:#}");
            ExitCode::FAILURE
        }
    }
}
