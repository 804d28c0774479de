//! Presenter (§4.9, C9): renders a tuple as text, JSON, JSON-lines, CSV, or
//! "minimal" (deduped).

use chrono::{DateTime, Utc};
use pdnsq_config::TimeFormat;
use pdnsq_types::asinfo::AsInfo;
use pdnsq_types::{Mode, QParam, RData, SummaryRecord, Tuple};

/// The selected rendering for one Writer (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    Minimal,
}

/// Per-rdata AS-info annotation carried alongside a tuple for presentation.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub asinfo: Option<AsInfo>,
}

/// The `_dnsdbq` query-detail block attached under `TRANS_QDETAIL` (§4.9).
#[derive(Debug, Clone)]
pub struct QueryDetail<'a> {
    pub descr: &'a str,
    pub after: Option<u64>,
    pub before: Option<u64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub gravel: bool,
    pub complete: bool,
    pub follow: bool,
}

impl<'a> QueryDetail<'a> {
    #[must_use]
    pub fn new(descr: &'a str, params: &QParam) -> Self {
        Self {
            descr,
            after: params.after,
            before: params.before,
            limit: params.query_limit,
            offset: params.offset,
            gravel: params.gravel,
            complete: params.complete,
            follow: params.follow,
        }
    }
}

fn render_time(value: u64, format: TimeFormat) -> String {
    match format {
        TimeFormat::Epoch => value.to_string(),
        TimeFormat::Iso8601 | TimeFormat::IsoStrict => {
            DateTime::<Utc>::from_timestamp(value as i64, 0)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| value.to_string())
        }
    }
}

fn format_asinfo_comment(info: &AsInfo) -> String {
    format!("AS{} {}", info.asn, info.cidr)
}

/// Renders one tuple in `text` mode (§4.9): dig-like header, one
/// `rrname rrtype rdata[ ; comment]` line per rdata value.
#[must_use]
pub fn render_text(tuple: &Tuple, format: TimeFormat, annotations: &[Annotation]) -> String {
    let mut out = String::new();
    let mut header_parts = Vec::new();
    if let (Some(first), Some(last)) = (tuple.time_first, tuple.time_last) {
        header_parts.push(format!(
            "time_first: {}, time_last: {} ({}..{})",
            render_time(first, format),
            render_time(last, format),
            first,
            last
        ));
    }
    if let (Some(first), Some(last)) = (tuple.zone_time_first, tuple.zone_time_last) {
        header_parts.push(format!(
            "zone_first: {}, zone_last: {}",
            render_time(first, format),
            render_time(last, format)
        ));
    }
    if let Some(count) = tuple.count {
        header_parts.push(format!("count: {count}"));
    }
    if let Some(bailiwick) = &tuple.bailiwick {
        header_parts.push(format!("bailiwick: {bailiwick}"));
    }
    if !header_parts.is_empty() {
        out.push_str("; ");
        out.push_str(&header_parts.join("; "));
        out.push('\n');
    }

    for (i, rdata) in tuple.rdata.values().into_iter().enumerate() {
        out.push_str(&tuple.rrname);
        out.push(' ');
        out.push_str(&tuple.rrtype);
        out.push(' ');
        out.push_str(rdata);
        if let Some(annotation) = annotations.get(i)
            && let Some(info) = &annotation.asinfo
        {
            out.push_str(" ; ");
            out.push_str(&format_asinfo_comment(info));
        }
        out.push('\n');
    }
    out
}

/// Renders one tuple as a single JSON-lines object (§4.9).
#[must_use]
pub fn render_json(
    tuple: &Tuple,
    format: TimeFormat,
    datefix: bool,
    detail: Option<&QueryDetail>,
    annotations: &[Annotation],
) -> String {
    let mut obj: serde_json::Value =
        serde_json::from_str(&tuple.raw_json).unwrap_or_else(|_| serde_json::json!({}));

    if datefix {
        if let Some(first) = tuple.time_first {
            obj["time_first"] = serde_json::Value::String(render_time(first, format));
        }
        if let Some(last) = tuple.time_last {
            obj["time_last"] = serde_json::Value::String(render_time(last, format));
        }
    }

    if let Some(detail) = detail {
        obj["_dnsdbq"] = serde_json::json!({
            "descr": detail.descr,
            "after": detail.after,
            "before": detail.before,
            "limit": detail.limit,
            "offset": detail.offset,
            "gravel": detail.gravel,
            "complete": detail.complete,
            "follow": detail.follow,
        });
    }

    if annotations.iter().any(|a| a.asinfo.is_some()) {
        let annos: Vec<serde_json::Value> = annotations
            .iter()
            .map(|a| match &a.asinfo {
                Some(info) => serde_json::json!({ "asn": info.asn, "cidr": info.cidr }),
                None => serde_json::Value::Null,
            })
            .collect();
        obj["anno"] = serde_json::json!({ "asinfo": annos });
    }

    obj.to_string()
}

/// Renders one CSV data row (no header) for a tuple (§4.9). The caller emits
/// the header line once per Writer via [`csv_header`].
#[must_use]
pub fn render_csv(tuple: &Tuple, with_asinfo: bool, annotations: &[Annotation]) -> Vec<String> {
    fn quote(s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    tuple
        .rdata
        .values()
        .into_iter()
        .enumerate()
        .map(|(i, rdata)| {
            let mut fields = vec![
                quote(&tuple.time_first.map(|v| v.to_string()).unwrap_or_default()),
                quote(&tuple.time_last.map(|v| v.to_string()).unwrap_or_default()),
                quote(&tuple.count.map(|v| v.to_string()).unwrap_or_default()),
                quote(&tuple.bailiwick.clone().unwrap_or_default()),
                quote(&tuple.rrname),
                quote(&tuple.rrtype),
                quote(rdata),
            ];
            if with_asinfo {
                let (asn, cidr) = annotations
                    .get(i)
                    .and_then(|a| a.asinfo.as_ref())
                    .map_or((String::new(), String::new()), |info| {
                        (info.asn.clone(), info.cidr.clone())
                    });
                fields.push(quote(&asn));
                fields.push(quote(&cidr));
            }
            fields.join(",")
        })
        .collect()
}

#[must_use]
pub fn csv_header(with_asinfo: bool) -> String {
    let mut fields = vec!["time_first", "time_last", "count", "bailiwick", "rrname", "rrtype", "rdata"];
    if with_asinfo {
        fields.push("asn");
        fields.push("cidr");
    }
    fields.join(",")
}

/// Renders `minimal` mode (§4.9): one deduped string per line, left-hand
/// side only for rrset queries, right-hand side only for rdata queries.
#[must_use]
pub fn render_minimal(tuple: &Tuple, mode: Mode) -> Vec<String> {
    match mode {
        Mode::Rrset | Mode::RawRrset => vec![tuple.rrname.clone()],
        Mode::Name | Mode::Ip | Mode::RawName => {
            match &tuple.rdata {
                RData::One(s) => vec![s.clone()],
                RData::Many(items) => items.clone(),
            }
        }
    }
}

/// Renders one `summarize`-mode response (§4.9 "summarize variants") in
/// `text` mode: just the aggregate counts, no rrname/rrtype/rdata.
#[must_use]
pub fn render_summary_text(summary: &SummaryRecord, format: TimeFormat) -> String {
    let mut parts = Vec::new();
    if let Some(count) = summary.count {
        parts.push(format!("count: {count}"));
    }
    if let Some(num_results) = summary.num_results {
        parts.push(format!("num_results: {num_results}"));
    }
    if let (Some(first), Some(last)) = (summary.time_first, summary.time_last) {
        parts.push(format!(
            "time_first: {}, time_last: {}",
            render_time(first, format),
            render_time(last, format)
        ));
    }
    if parts.is_empty() { "; no data\n".to_string() } else { format!("; {}\n", parts.join("; ")) }
}

/// Renders one summarize response as a single JSON object (§4.9).
#[must_use]
pub fn render_summary_json(summary: &SummaryRecord, format: TimeFormat, datefix: bool) -> String {
    let mut obj = serde_json::json!({
        "count": summary.count,
        "num_results": summary.num_results,
    });
    if datefix {
        if let Some(first) = summary.time_first {
            obj["time_first"] = serde_json::Value::String(render_time(first, format));
        }
        if let Some(last) = summary.time_last {
            obj["time_last"] = serde_json::Value::String(render_time(last, format));
        }
    } else {
        if let Some(first) = summary.time_first {
            obj["time_first"] = serde_json::json!(first);
        }
        if let Some(last) = summary.time_last {
            obj["time_last"] = serde_json::json!(last);
        }
    }
    obj.to_string()
}

/// Renders one summarize response as a CSV data row (no header).
#[must_use]
pub fn render_summary_csv(summary: &SummaryRecord) -> String {
    fn field(v: Option<u64>) -> String {
        format!("\"{}\"", v.map(|n| n.to_string()).unwrap_or_default())
    }
    [field(summary.count), field(summary.num_results)].join(",")
}

#[must_use]
pub fn summary_csv_header() -> String {
    "count,num_results".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tuple {
        pdnsq_types::parse_tuple(
            r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":3,"time_first":100,"time_last":200}"#,
        )
        .unwrap()
    }

    #[test]
    fn text_mode_includes_header_and_record_line() {
        let tuple = sample();
        let out = render_text(&tuple, TimeFormat::Epoch, &[]);
        assert!(out.contains("count: 3"));
        assert!(out.contains("a. A 1.2.3.4"));
    }

    #[test]
    fn text_mode_appends_asinfo_comment() {
        let tuple = sample();
        let annotations = [Annotation {
            asinfo: Some(AsInfo { asn: "15169".to_string(), cidr: "8.8.8.0/24".to_string() }),
        }];
        let out = render_text(&tuple, TimeFormat::Epoch, &annotations);
        assert!(out.contains("AS15169 8.8.8.0/24"));
    }

    #[test]
    fn json_mode_datefix_rewrites_times() {
        let tuple = sample();
        let out = render_json(&tuple, TimeFormat::Iso8601, true, None, &[]);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value["time_first"].as_str().unwrap().contains("1970"));
    }

    #[test]
    fn json_mode_without_datefix_preserves_raw_numbers() {
        let tuple = sample();
        let out = render_json(&tuple, TimeFormat::Epoch, false, None, &[]);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["time_first"].as_u64(), Some(100));
    }

    #[test]
    fn csv_header_includes_asinfo_columns_only_when_enabled() {
        assert!(!csv_header(false).contains("asn"));
        assert!(csv_header(true).contains("asn"));
    }

    #[test]
    fn minimal_mode_rrset_emits_rrname_only() {
        let tuple = sample();
        assert_eq!(render_minimal(&tuple, Mode::Rrset), vec!["a.".to_string()]);
    }

    #[test]
    fn minimal_mode_rdata_emits_rdata_only() {
        let tuple = sample();
        assert_eq!(render_minimal(&tuple, Mode::Ip), vec!["1.2.3.4".to_string()]);
    }

    #[test]
    fn summary_text_renders_counts() {
        let summary = SummaryRecord { count: Some(7), num_results: Some(7), ..Default::default() };
        let out = render_summary_text(&summary, TimeFormat::Epoch);
        assert!(out.contains("count: 7"));
        assert!(out.contains("num_results: 7"));
    }

    #[test]
    fn summary_json_round_trips_count() {
        let summary = SummaryRecord { count: Some(7), ..Default::default() };
        let out = render_summary_json(&summary, TimeFormat::Epoch, false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["count"].as_u64(), Some(7));
    }

    #[test]
    fn summary_csv_has_two_fields() {
        let summary = SummaryRecord { count: Some(1), num_results: Some(2), ..Default::default() };
        assert_eq!(render_summary_csv(&summary), "\"1\",\"2\"");
        assert_eq!(summary_csv_header(), "count,num_results");
    }
}
