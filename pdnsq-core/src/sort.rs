//! External-sort subprocess (§4.8, C8): forks `sort(1)` with `-u` plus one
//! `-k<N>[,<N>r]` per active key, and the intermediate sort-line format.

use std::process::Stdio;

use pdnsq_types::{RData, Tuple, sortable_rdata, sortable_rrname};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// The seven allowed sort keys (§4.8), 1-indexed into the sort-line format
/// `<first> <last> <duration> <count> <name-key> <type> <data-key> <raw-json>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    First,
    Last,
    Duration,
    Count,
    Name,
    Type,
    Data,
}

impl SortKey {
    fn field_index(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Last => 2,
            Self::Duration => 3,
            Self::Count => 4,
            Self::Name => 5,
            Self::Type => 6,
            Self::Data => 7,
        }
    }

    /// All seven keys in field order, registered whenever sorting is
    /// enabled so `-u` dedups on every column (§4.8).
    #[must_use]
    pub fn all() -> [SortKey; 7] {
        [
            Self::First,
            Self::Last,
            Self::Duration,
            Self::Count,
            Self::Name,
            Self::Type,
            Self::Data,
        ]
    }
}

/// Whether a key sorts ascending or descending (the CLI's `-k<name>r` form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub reverse: bool,
}

fn sort_args(specs: &[SortSpec]) -> Vec<String> {
    let mut args = vec!["-u".to_string()];
    for spec in specs {
        let field = spec.key.field_index();
        let suffix = if spec.reverse { "r" } else { "" };
        args.push(format!("-k{field},{field}{suffix}"));
    }
    args
}

/// Builds the intermediate sort-line for one tuple (§4.8). `raw-json` is the
/// last field and may contain arbitrary bytes except a newline.
#[must_use]
pub fn sort_line(tuple: &Tuple) -> String {
    let first = tuple.time_first.unwrap_or(0);
    let last = tuple.time_last.unwrap_or(0);
    let duration = last.saturating_sub(first);
    let count = tuple.count.unwrap_or(0);
    let name_key = sortable_rrname(&tuple.rrname);
    let data_key = match &tuple.rdata {
        RData::One(s) => sortable_rdata(&tuple.rrtype, s),
        RData::Many(items) => items
            .first()
            .map(|s| sortable_rdata(&tuple.rrtype, s))
            .unwrap_or_default(),
    };
    format!(
        "{first} {last} {duration} {count} {name_key} {} {data_key} {}",
        tuple.rrtype, tuple.raw_json
    )
}

/// Extracts the raw-JSON payload (everything after the seventh space) from a
/// sort-line. Used on readback to re-parse via C5 (§8 invariant 5: the
/// round trip must be bit-exact).
#[must_use]
pub fn sort_line_payload(line: &str) -> Option<&str> {
    let mut rest = line;
    for _ in 0..7 {
        let idx = rest.find(' ')?;
        rest = &rest[idx + 1..];
    }
    Some(rest)
}

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("failed to spawn sort(1): {0}")]
    Spawn(#[from] std::io::Error),
    #[error("sort(1) produced no stdin/stdout pipe")]
    MissingPipe,
}

/// A running `sort(1)` subprocess, piping sort-lines in and reading the
/// deduped, ordered result back out.
pub struct SortPipeline {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl SortPipeline {
    /// Spawns `sort(1)` with the given keys, `LC_ALL=C`, and a cleared
    /// environment otherwise (§4.8, §6).
    pub fn spawn(specs: &[SortSpec]) -> Result<Self, SortError> {
        let mut command = Command::new("sort");
        command
            .args(sort_args(specs))
            .env_clear()
            .env("LC_ALL", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or(SortError::MissingPipe)?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Writes one sort-line (with its trailing newline) to the subprocess.
    pub async fn write_line(&mut self, line: &str) -> Result<(), SortError> {
        if let Some(stdin) = self.stdin.as_mut() {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }
        Ok(())
    }

    /// Closes stdin (parent closes its write end before reading, §5, to
    /// avoid deadlock) so `sort` can flush its output.
    pub async fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Reads the next output line, or `None` at EOF.
    pub async fn read_line(&mut self) -> Result<Option<String>, SortError> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Sends `SIGTERM` to the subprocess (unix) to avoid a `SIGPIPE` on the
    /// writer side when `output_limit` short-circuits readback (§4.8). On
    /// non-unix targets this falls back to `Child::start_kill`, a
    /// platform-limited substitute noted in `DESIGN.md`.
    pub fn terminate(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                // SAFETY: `pid` is a live child process id owned by `self.child`.
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdnsq_types::parse_tuple;

    #[test]
    fn sort_args_registers_requested_keys_with_direction() {
        let specs = [
            SortSpec { key: SortKey::First, reverse: false },
            SortSpec { key: SortKey::Name, reverse: true },
        ];
        let args = sort_args(&specs);
        assert_eq!(args, vec!["-u", "-k1,1", "-k5,5r"]);
    }

    /// Invariant 5 (spec.md §8): the raw-JSON payload extracted from a
    /// sort-line equals the original input line, bit-exact.
    #[test]
    fn sort_line_payload_round_trips() {
        let raw = r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":1,"time_first":100,"time_last":200}"#;
        let tuple = parse_tuple(raw).unwrap();
        let line = sort_line(&tuple);
        assert_eq!(sort_line_payload(&line), Some(raw));
    }

    #[test]
    fn sort_line_payload_handles_spaces_in_raw_json() {
        let raw = r#"{"rrname":"a.","rrtype":"MX","rdata":"10 mail.example.com.","count":1}"#;
        let tuple = parse_tuple(raw).unwrap();
        let line = sort_line(&tuple);
        assert_eq!(sort_line_payload(&line), Some(raw));
    }
}
