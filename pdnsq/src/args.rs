//! Command-line surface (§6): argument parsing is out of the core's scope
//! (spec.md §1's Non-goals), but a complete binary needs one. Flags mirror
//! the knob list in `SPEC_FULL.md` §6.

use clap::{Parser, ValueEnum};
use pdnsq_config::{Batching as ConfigBatching, Sorting as ConfigSorting};
use pdnsq_core::OutputFormat;
use pdnsq_types::{Mode, QDesc};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortingArg {
    NoSort,
    Sort,
    SortReverse,
}

impl From<SortingArg> for ConfigSorting {
    fn from(value: SortingArg) -> Self {
        match value {
            SortingArg::NoSort => ConfigSorting::NoSort,
            SortingArg::Sort => ConfigSorting::NormalSort,
            SortingArg::SortReverse => ConfigSorting::ReverseSort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BatchingArg {
    None,
    Terse,
    Verbose,
}

impl From<BatchingArg> for ConfigBatching {
    fn from(value: BatchingArg) -> Self {
        match value {
            BatchingArg::None => ConfigBatching::None,
            BatchingArg::Terse => ConfigBatching::Terse,
            BatchingArg::Verbose => ConfigBatching::Verbose,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum FormatArg {
    #[default]
    Text,
    Json,
    Csv,
    Minimal,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Minimal => OutputFormat::Minimal,
        }
    }
}

/// A command-line client for passive-DNS (pDNS) query services.
#[derive(Debug, Parser)]
#[command(name = "pdnsq", version, about)]
pub struct Args {
    /// Increase debug verbosity; repeatable (-d, -dd).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Disable TLS certificate verification.
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Force IPv4 for backend connections.
    #[arg(long, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Force IPv6 for backend connections.
    #[arg(long)]
    pub ipv6: bool,

    /// Annotate results with autonomous-system info.
    #[arg(long)]
    pub asinfo: bool,

    /// Zone used for the AS-info TXT lookup.
    #[arg(long, default_value = "asn.cymru.com")]
    pub asinfo_domain: String,

    /// Sort order applied to output (requires the external `sort` utility).
    #[arg(long, value_enum)]
    pub sort: Option<SortingArg>,

    /// Batch-mode fan-out verbosity for multi-query input.
    #[arg(long, value_enum, default_value = "none")]
    pub batch: BatchingArg,

    /// Read newline-delimited query specs from this file (batch mode).
    #[arg(short = 'f', long)]
    pub batch_file: Option<std::path::PathBuf>,

    /// Output rendering.
    #[arg(long, value_enum, default_value = "text")]
    pub format: FormatArg,

    /// Allow multiple types/values per query.
    #[arg(short = 'm', long)]
    pub multiple: bool,

    /// Suppress informational postscript output.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Reverse rrnames/rdata for sort locality (`TRANS_REVERSE`).
    #[arg(long)]
    pub reverse: bool,

    /// Remove a trailing root label before presenting names.
    #[arg(long)]
    pub chomp: bool,

    /// Render epoch timestamps as ISO-8601 (`TRANS_DATEFIX`).
    #[arg(long)]
    pub datefix: bool,

    /// Attach query-descriptor detail to JSON output (`TRANS_QDETAIL`).
    #[arg(long)]
    pub qdetail: bool,

    /// Stop after this many presented records.
    #[arg(short = 'l', long)]
    pub output_limit: Option<i64>,

    /// Stop after this many records per fetch (passed to the backend).
    #[arg(short = 'L', long)]
    pub query_limit: Option<i64>,

    /// Skip this many leading records (passed to the backend).
    #[arg(long)]
    pub offset: Option<i64>,

    /// Request an aggregate count instead of per-record output.
    #[arg(long)]
    pub summarize: bool,

    /// Maximum concurrent in-flight HTTP transfers.
    #[arg(long, default_value_t = 8)]
    pub max_in_flight: usize,

    /// Backend system to use; overrides `default_system` in the config file.
    #[arg(long, env = "DNSDBQ_SYSTEM")]
    pub system: Option<String>,

    /// Path to the configuration file.
    #[arg(long, env = "DNSDBQ_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// `rrset/name/NAME` query.
    #[arg(short = 'r')]
    pub rrset: Option<String>,

    /// `rdata/name/NAME` query.
    #[arg(short = 'n')]
    pub rdata_name: Option<String>,

    /// `rdata/ip/ADDR` query.
    #[arg(short = 'i')]
    pub rdata_ip: Option<String>,

    /// `rrset/raw/HEX` query.
    #[arg(short = 'R')]
    pub raw_rrset: Option<String>,

    /// `rdata/raw/HEX` query.
    #[arg(short = 'N')]
    pub raw_rdata: Option<String>,

    /// Record type filter (repeatable).
    #[arg(short = 't', long = "type")]
    pub rrtype: Vec<String>,

    /// Bailiwick filter (rrset queries only).
    #[arg(short = 'b', long)]
    pub bailiwick: Option<String>,

    /// Follow CNAME chains.
    #[arg(long)]
    pub follow: bool,

    /// Only include tuples wholly within the time window.
    #[arg(long)]
    pub complete: bool,

    /// Include low-value ("gravel") records.
    #[arg(long)]
    pub gravel: bool,

    /// Lower bound of the time window (epoch seconds).
    #[arg(long)]
    pub after: Option<u64>,

    /// Upper bound of the time window (epoch seconds).
    #[arg(long)]
    pub before: Option<u64>,
}

/// Builds the single [`QDesc`] this invocation describes from the mutually
/// exclusive `-r`/`-n`/`-i`/`-R`/`-N` flags (§6). Returns `None` when the
/// caller intends batch-file mode instead.
#[must_use]
pub fn qdesc_from_args(args: &Args) -> Option<QDesc> {
    let (mode, thing) = if let Some(name) = &args.rrset {
        (Mode::Rrset, name.clone())
    } else if let Some(name) = &args.rdata_name {
        (Mode::Name, name.clone())
    } else if let Some(addr) = &args.rdata_ip {
        (Mode::Ip, addr.clone())
    } else if let Some(hex) = &args.raw_rrset {
        (Mode::RawRrset, hex.clone())
    } else if let Some(hex) = &args.raw_rdata {
        (Mode::RawName, hex.clone())
    } else {
        return None;
    };

    let mut qdesc = if mode == Mode::Ip {
        let (addr, pfxlen) = split_cidr(&thing);
        let mut qdesc = QDesc::new(mode, addr);
        if let Some(pfxlen) = pfxlen {
            qdesc = qdesc.with_pfxlen(pfxlen);
        }
        qdesc
    } else {
        QDesc::new(mode, thing)
    }
    .with_rrtype(args.rrtype.clone());
    if let Some(bailiwick) = &args.bailiwick {
        qdesc = qdesc.with_bailiwick(bailiwick.clone());
    }
    Some(qdesc)
}

/// Splits an `-i` argument's optional CIDR suffix (`8.8.8.0/24`) into the
/// bare address and prefix length, matching the batch-file grammar's
/// `rdata/ip/ADDR/PFXLEN` split (`batch::parse_batch_line`).
fn split_cidr(thing: &str) -> (String, Option<u8>) {
    match thing.split_once('/') {
        Some((addr, pfxlen)) => (addr.to_string(), pfxlen.parse().ok()),
        None => (thing.to_string(), None),
    }
}
