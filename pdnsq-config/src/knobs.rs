//! Process-wide knobs: the typed form of the CLI flags and environment
//! variables listed in spec.md §6, independent of which backend is selected.

/// Sort order for presented results, per the `-s`/`-S` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sorting {
    #[default]
    NoSort,
    NormalSort,
    ReverseSort,
}

/// Batch-mode query fan-out verbosity, per the `-B`/`-M` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Batching {
    #[default]
    None,
    Terse,
    Verbose,
}

/// Output transforms applied by the presenter, per the `-F`/`-X` flags.
/// Several bits may be set at once, so this is a small bitset rather than
/// an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transforms {
    /// `-F`: render epoch timestamps as ISO-8601.
    pub datefix: bool,
    /// `-X`: emit rrnames/rdata reversed (NS-order) for sort locality.
    pub reverse: bool,
    /// chomp trailing root label before emitting rrnames.
    pub chomp: bool,
    /// `-v`: append query-descriptor detail to each output record.
    pub qdetail: bool,
}

/// How `DNSDBQ_TIME_FORMAT` (or the absence of it) should render times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    Epoch,
    Iso8601,
    IsoStrict,
}

impl TimeFormat {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "iso" | "iso8601" => TimeFormat::Iso8601,
            "iso-strict" | "strict" => TimeFormat::IsoStrict,
            _ => TimeFormat::Epoch,
        }
    }
}

/// The full knob set threaded through the core crate: everything that is
/// not "which backend, with which credentials" (that lives in [`crate::Config`]'s
/// `systems` map instead).
#[derive(Debug, Clone)]
pub struct Knobs {
    pub debug_level: u8,
    pub donotverify: bool,
    pub asinfo_lookup: bool,
    pub asinfo_domain: String,
    pub sorting: Sorting,
    pub batching: Batching,
    pub multiple: bool,
    pub quiet: bool,
    pub transforms: Transforms,
    pub output_limit: Option<u64>,
    pub query_limit: Option<u64>,
    pub max_in_flight: usize,
    pub time_format: TimeFormat,
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            debug_level: 0,
            donotverify: false,
            asinfo_lookup: false,
            asinfo_domain: "asn.cymru.com".to_string(),
            sorting: Sorting::default(),
            batching: Batching::default(),
            multiple: false,
            quiet: false,
            transforms: Transforms::default(),
            output_limit: None,
            query_limit: None,
            max_in_flight: 8,
            time_format: TimeFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_format_parses_known_aliases() {
        assert_eq!(TimeFormat::parse("iso8601"), TimeFormat::Iso8601);
        assert_eq!(TimeFormat::parse("strict"), TimeFormat::IsoStrict);
        assert_eq!(TimeFormat::parse("garbage"), TimeFormat::Epoch);
    }

    #[test]
    fn knobs_default_matches_dnsdbq_defaults() {
        let knobs = Knobs::default();
        assert_eq!(knobs.sorting, Sorting::NoSort);
        assert_eq!(knobs.batching, Batching::None);
        assert!(!knobs.asinfo_lookup);
        assert_eq!(knobs.max_in_flight, 8);
    }
}
