//! Writer / output assembly (§3, §4.8, C8): output-limit enforcement, the
//! minimal-mode deduper, and the batch-verbose postscript trailer.
//!
//! The external-sort half of C8 lives in [`crate::sort`]; this module is the
//! non-sorted direct-to-stdout path plus the bookkeeping shared by both.

use std::collections::HashSet;

use pdnsq_config::TimeFormat;
use pdnsq_types::{Mode, Tuple};

use crate::presenter::{
    Annotation, OutputFormat, QueryDetail, csv_header, render_csv, render_json, render_minimal,
    render_text,
};

/// What a call to [`Writer::present`] produced: zero or more rendered lines,
/// and whether `output_limit` was just reached (the caller should mark the
/// originating Fetch `stopped`, per §4.8).
#[derive(Debug, Default)]
pub struct PresentOutcome {
    pub lines: Vec<String>,
    pub limit_reached: bool,
}

/// Collects the output of one or more Queries (§3). Owns the
/// output-limit counter, the minimal-mode dedup set, and the postscript
/// buffer; the external sort subprocess (when enabled) is owned alongside
/// this by the caller, which also drives readback through [`crate::sort`].
pub struct Writer {
    format: OutputFormat,
    output_limit: Option<i64>,
    emitted: i64,
    seen_minimal: HashSet<String>,
    csv_header_printed: bool,
    postscript: Vec<String>,
    time_format: TimeFormat,
    datefix: bool,
    with_asinfo: bool,
    qdetail: bool,
}

impl Writer {
    #[must_use]
    pub fn new(
        format: OutputFormat,
        output_limit: Option<i64>,
        time_format: TimeFormat,
        datefix: bool,
        with_asinfo: bool,
        qdetail: bool,
    ) -> Self {
        Self {
            format,
            output_limit,
            emitted: 0,
            seen_minimal: HashSet::new(),
            csv_header_printed: false,
            postscript: Vec::new(),
            time_format,
            datefix,
            with_asinfo,
            qdetail,
        }
    }

    fn limit_exhausted(&self) -> bool {
        self.output_limit.is_some_and(|limit| self.emitted >= limit)
    }

    /// Renders one tuple and enforces `output_limit` (§8 invariant 6: exactly
    /// `min(N, total-records)` records are presented). `mode` selects the
    /// left/right-hand side of `minimal` output and is passed per call,
    /// rather than fixed at construction, so one Writer can span queries of
    /// different shapes across a batch-file run (§3 "collects the output of
    /// one or more queries").
    pub fn present(
        &mut self,
        tuple: &Tuple,
        mode: Mode,
        detail: Option<&QueryDetail>,
        annotations: &[Annotation],
    ) -> PresentOutcome {
        if self.limit_exhausted() {
            return PresentOutcome { lines: Vec::new(), limit_reached: true };
        }

        let mut lines = Vec::new();
        match self.format {
            OutputFormat::Text => {
                lines.push(render_text(tuple, self.time_format, annotations));
            }
            OutputFormat::Json => {
                let detail = self.qdetail.then_some(detail).flatten();
                lines.push(render_json(tuple, self.time_format, self.datefix, detail, annotations));
            }
            OutputFormat::Csv => {
                if !self.csv_header_printed {
                    lines.push(csv_header(self.with_asinfo));
                    self.csv_header_printed = true;
                }
                lines.extend(render_csv(tuple, self.with_asinfo, annotations));
            }
            OutputFormat::Minimal => {
                for candidate in render_minimal(tuple, mode) {
                    if self.seen_minimal.insert(candidate.clone()) {
                        lines.push(candidate);
                    }
                }
            }
        }

        self.emitted += 1;
        let limit_reached = self.limit_exhausted();
        PresentOutcome { lines, limit_reached }
    }

    /// Records the `-- <status> (<message>)` trailer for one query (§4.8,
    /// §8 scenario S2/S6), flushed at writer teardown.
    pub fn push_postscript(&mut self, status: &str, message: &str) {
        self.postscript.push(format!("-- {status} ({message})"));
    }

    #[must_use]
    pub fn postscript(&self) -> &[String] {
        &self.postscript
    }

    #[must_use]
    pub fn emitted(&self) -> i64 {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: u64) -> Tuple {
        pdnsq_types::parse_tuple(&format!(
            r#"{{"rrname":"{n}.example.","rrtype":"A","rdata":"1.2.3.{n}","count":1}}"#
        ))
        .unwrap()
    }

    /// Invariant 6 (spec.md §8): for any N >= 0, exactly min(N, total)
    /// records are presented.
    #[test]
    fn output_limit_is_monotonically_enforced() {
        let mut writer = Writer::new(
            OutputFormat::Text,
            Some(2),
            TimeFormat::Epoch,
            false,
            false,
            false,
        );
        let mut printed = 0;
        let mut stopped_at = None;
        for n in 1..=5u64 {
            let outcome = writer.present(&sample(n), Mode::Rrset, None, &[]);
            if !outcome.lines.is_empty() {
                printed += 1;
            }
            if outcome.limit_reached && stopped_at.is_none() {
                stopped_at = Some(n);
            }
        }
        assert_eq!(printed, 2);
        assert_eq!(writer.emitted(), 2);
        assert_eq!(stopped_at, Some(2));
    }

    #[test]
    fn minimal_mode_dedupes_exact_matches() {
        let mut writer = Writer::new(
            OutputFormat::Minimal,
            None,
            TimeFormat::Epoch,
            false,
            false,
            false,
        );
        let tuple = pdnsq_types::parse_tuple(
            r#"{"rrname":"dup.example.","rrtype":"A","rdata":"1.2.3.4"}"#,
        )
        .unwrap();
        let first = writer.present(&tuple, Mode::Rrset, None, &[]);
        let second = writer.present(&tuple, Mode::Rrset, None, &[]);
        assert_eq!(first.lines, vec!["dup.example.".to_string()]);
        assert!(second.lines.is_empty());
    }

    #[test]
    fn postscript_accumulates_in_order() {
        let mut writer = Writer::new(
            OutputFormat::Text,
            None,
            TimeFormat::Epoch,
            false,
            false,
            false,
        );
        writer.push_postscript("NOERROR", "ok");
        writer.push_postscript("SERVFAIL", "boom");
        assert_eq!(writer.postscript(), ["-- NOERROR (ok)", "-- SERVFAIL (boom)"]);
    }
}
