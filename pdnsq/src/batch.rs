//! Batch-file front end: the "external collaborator" spec.md calls
//! out-of-scope for the core (§1 "Argument parsing and the command/batch-file
//! front end") but that a complete binary still needs upstream of
//! [`pdnsq_core::build_query`]. One line in, one [`QDesc`] out, using the
//! same canonical-path grammar `pdnsq_backends::path::canonical_path`
//! produces on the way out (this module is its inverse, kept independent
//! since that module is private to the backends crate).

use pdnsq_types::{Mode, QDesc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("line {line}: empty query shape")]
    Empty { line: usize },
    #[error("line {line}: unrecognized query shape {shape:?}")]
    UnrecognizedShape { line: usize, shape: String },
    #[error("line {line}: {shape} requires a value")]
    MissingThing { line: usize, shape: String },
}

/// One line of batch-file input, resolved to a query descriptor plus the
/// line's 1-based position (for error messages and `++`/`--` headers).
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub line: usize,
    pub qdesc: QDesc,
}

/// Parses a whole batch file's contents (§6 `-f`/`--batch-file`). Blank
/// lines and `#`-prefixed comments are skipped, matching the convention the
/// teacher's own config/env parsing uses for its TOML/env inputs.
pub fn parse_batch(contents: &str) -> Result<Vec<BatchEntry>, BatchError> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                None
            } else {
                Some(parse_batch_line(trimmed, idx + 1))
            }
        })
        .collect()
}

/// Parses one non-empty, non-comment batch-file line into a [`BatchEntry`].
///
/// Recognized shapes, mirroring `canonical_path`'s grammar:
/// - `rrset/name/NAME[/TYPE[/BAILIWICK]]`
/// - `rrset/raw/HEX[/TYPE]`
/// - `rdata/name/NAME[/TYPE]`
/// - `rdata/ip/ADDR[/PFXLEN]`
/// - `rdata/raw/HEX[/TYPE]`
pub fn parse_batch_line(line: &str, line_no: usize) -> Result<BatchEntry, BatchError> {
    let mut parts = line.split('/');
    let kind = parts.next().filter(|s| !s.is_empty()).ok_or(BatchError::Empty { line: line_no })?;
    let subkind = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let shape = format!("{kind}/{subkind}");
    let thing = rest.first().copied().ok_or_else(|| BatchError::MissingThing {
        line: line_no,
        shape: shape.clone(),
    })?;

    let mode = match (kind, subkind) {
        ("rrset", "name") => Mode::Rrset,
        ("rrset", "raw") => Mode::RawRrset,
        ("rdata", "name") => Mode::Name,
        ("rdata", "ip") => Mode::Ip,
        ("rdata", "raw") => Mode::RawName,
        _ => return Err(BatchError::UnrecognizedShape { line: line_no, shape }),
    };

    let mut qdesc = QDesc::new(mode, thing.to_string());
    match mode {
        Mode::Rrset => {
            if let Some(rrtype) = rest.get(1) {
                qdesc = qdesc.with_rrtype(vec![(*rrtype).to_string()]);
            }
            if let Some(bailiwick) = rest.get(2) {
                qdesc = qdesc.with_bailiwick((*bailiwick).to_string());
            }
        }
        Mode::RawRrset | Mode::Name | Mode::RawName => {
            if let Some(rrtype) = rest.get(1) {
                qdesc = qdesc.with_rrtype(vec![(*rrtype).to_string()]);
            }
        }
        Mode::Ip => {
            if let Some(pfxlen) = rest.get(1) {
                if let Ok(pfxlen) = pfxlen.parse::<u8>() {
                    qdesc = qdesc.with_pfxlen(pfxlen);
                }
            }
        }
    }

    Ok(BatchEntry { line: line_no, qdesc })
}
