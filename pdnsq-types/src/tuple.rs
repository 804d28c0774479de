//! The Tuple data model (§3, §4.5): one parsed pDNS record.

use serde_json::Value;
use thiserror::Error;

/// `rdata` is either a single string or an ordered sequence of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    One(String),
    Many(Vec<String>),
}

impl RData {
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// The rdata value used to build the external-sort key (§4.8): the
    /// first value when there are several.
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            Self::One(s) => s.as_str(),
            Self::Many(items) => items.first().map_or("", String::as_str),
        }
    }
}

/// One parsed pDNS record. Immutable after parse (§3 invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub zone_time_first: Option<u64>,
    pub zone_time_last: Option<u64>,
    pub time_first: Option<u64>,
    pub time_last: Option<u64>,
    pub count: Option<u64>,
    pub bailiwick: Option<String>,
    pub rrname: String,
    pub rrtype: String,
    pub rdata: RData,
    pub num_results: Option<u64>,
    /// The original source line, retained verbatim for the sort-pass
    /// round trip (§8 invariant 5).
    pub raw_json: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(String),
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error("field {0:?} must be a non-negative integer")]
    InvalidInteger(&'static str),
    #[error("field {0:?} must be a string")]
    InvalidString(&'static str),
    #[error("field \"rdata\" must be a string or an array of strings")]
    InvalidRdataShape,
}

fn get_u64(value: &Value, key: &'static str) -> Result<Option<u64>, ParseError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or(ParseError::InvalidInteger(key)),
        Some(_) => Err(ParseError::InvalidInteger(key)),
    }
}

fn get_string_opt(value: &Value, key: &'static str) -> Result<Option<String>, ParseError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::InvalidString(key)),
    }
}

fn get_string_req(value: &Value, key: &'static str) -> Result<String, ParseError> {
    get_string_opt(value, key)?.ok_or(ParseError::MissingField(key))
}

fn get_rdata(value: &Value) -> Result<RData, ParseError> {
    match value.get("rdata") {
        Some(Value::String(s)) => Ok(RData::One(s.clone())),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => return Err(ParseError::InvalidRdataShape),
                }
            }
            Ok(RData::Many(out))
        }
        None => Err(ParseError::MissingField("rdata")),
        Some(_) => Err(ParseError::InvalidRdataShape),
    }
}

/// One aggregate count record, produced by a `summarize`-mode query (§4.9)
/// instead of per-record `Tuple`s. Unlike `Tuple`, a summarize response
/// carries no `rrname`/`rrtype`/`rdata` — it is a single row of totals, so it
/// gets its own parse path rather than relaxing `Tuple`'s required fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummaryRecord {
    pub count: Option<u64>,
    pub num_results: Option<u64>,
    pub zone_time_first: Option<u64>,
    pub zone_time_last: Option<u64>,
    pub time_first: Option<u64>,
    pub time_last: Option<u64>,
}

/// Parses one summarize-mode response line (§4.9) into a [`SummaryRecord`].
/// All fields are optional integers; an empty object is a valid (if useless)
/// summary.
pub fn parse_summary(line: &str) -> Result<SummaryRecord, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(SummaryRecord {
        count: get_u64(&value, "count")?,
        num_results: get_u64(&value, "num_results")?,
        zone_time_first: get_u64(&value, "zone_time_first")?,
        zone_time_last: get_u64(&value, "zone_time_last")?,
        time_first: get_u64(&value, "time_first")?,
        time_last: get_u64(&value, "time_last")?,
    })
}

/// Parses one COF JSON record line into a [`Tuple`]. On any violation of the
/// field-validation rules in spec.md §4.5, returns an error describing the
/// offending field; callers skip the record rather than aborting (§7).
pub fn parse_tuple(line: &str) -> Result<Tuple, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()))?;

    Ok(Tuple {
        zone_time_first: get_u64(&value, "zone_time_first")?,
        zone_time_last: get_u64(&value, "zone_time_last")?,
        time_first: get_u64(&value, "time_first")?,
        time_last: get_u64(&value, "time_last")?,
        count: get_u64(&value, "count")?,
        bailiwick: get_string_opt(&value, "bailiwick")?,
        rrname: get_string_req(&value, "rrname")?,
        rrtype: get_string_req(&value, "rrtype")?,
        rdata: get_rdata(&value)?,
        num_results: get_u64(&value, "num_results")?,
        raw_json: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_record() {
        let t = parse_tuple(r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":1}"#)
            .unwrap();
        assert_eq!(t.rrname, "a.");
        assert_eq!(t.rrtype, "A");
        assert_eq!(t.rdata, RData::One("1.2.3.4".to_string()));
        assert_eq!(t.count, Some(1));
        assert_eq!(t.raw_json, r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":1}"#);
    }

    #[test]
    fn parses_multi_rdata_array() {
        let t = parse_tuple(r#"{"rrname":"a.","rrtype":"NS","rdata":["ns1.","ns2."]}"#).unwrap();
        assert_eq!(
            t.rdata,
            RData::Many(vec!["ns1.".to_string(), "ns2.".to_string()])
        );
    }

    #[test]
    fn rejects_negative_count() {
        let err = parse_tuple(r#"{"rrname":"a.","rrtype":"A","rdata":"1.2.3.4","count":-1}"#)
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidInteger("count"));
    }

    #[test]
    fn rejects_float_time_first() {
        let err =
            parse_tuple(r#"{"rrname":"a.","rrtype":"A","rdata":"x","time_first":1.5}"#)
                .unwrap_err();
        assert_eq!(err, ParseError::InvalidInteger("time_first"));
    }

    #[test]
    fn rejects_missing_rrname() {
        let err = parse_tuple(r#"{"rrtype":"A","rdata":"x"}"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField("rrname"));
    }

    #[test]
    fn rejects_bad_rdata_shape() {
        let err = parse_tuple(r#"{"rrname":"a.","rrtype":"A","rdata":5}"#).unwrap_err();
        assert_eq!(err, ParseError::InvalidRdataShape);
    }

    #[test]
    fn rejects_non_string_in_rdata_array() {
        let err = parse_tuple(r#"{"rrname":"a.","rrtype":"A","rdata":["x",5]}"#).unwrap_err();
        assert_eq!(err, ParseError::InvalidRdataShape);
    }

    #[test]
    fn parses_summary_record() {
        let s = parse_summary(r#"{"count":42,"num_results":42}"#).unwrap();
        assert_eq!(s.count, Some(42));
        assert_eq!(s.num_results, Some(42));
    }

    #[test]
    fn parses_empty_summary_record() {
        let s = parse_summary("{}").unwrap();
        assert_eq!(s, SummaryRecord::default());
    }

    #[test]
    fn summary_record_rejects_bad_integer() {
        let err = parse_summary(r#"{"count":"many"}"#).unwrap_err();
        assert_eq!(err, ParseError::InvalidInteger("count"));
    }
}
