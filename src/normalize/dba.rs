//! DBA ("doing business as") extraction.
//!
//! Scans for `{DBA | d/b/a | d.b.a. | trading as | t/a}` case-insensitively
//! with word boundaries, splitting on the first occurrence.

use once_cell::sync::Lazy;
use regex::Regex;

static DBA_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(d\.?\s?/?\s?b\.?\s?/?\s?a\.?|dba|trading\s+as|t/a)\b").unwrap()
});

/// Result of splitting a raw name on a DBA marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbaSplit {
    pub legal_name: String,
    pub trade_name: Option<String>,
}

/// Splits `input` into `{legal_name, trade_name}` on the first DBA marker,
/// or returns `{legal_name: input, trade_name: None}` if no marker is
/// found.
pub fn extract_dba(input: &str) -> DbaSplit {
    match DBA_MARKER_RE.find(input) {
        Some(m) => DbaSplit {
            legal_name: input[..m.start()].trim().to_string(),
            trade_name: Some(input[m.end()..].trim().to_string()),
        },
        None => DbaSplit {
            legal_name: input.to_string(),
            trade_name: None,
        },
    }
}

/// Whether `name` contains a bare DBA marker (used by the discrepancy
/// detector's `DBA_NOT_IN_LOANIQ` trigger and the fuzzy matcher's DBA
/// sub-routine).
pub fn contains_dba_marker(name: &str) -> bool {
    DBA_MARKER_RE.is_match(name)
}
