//! Canonical identifier formats.
//!
//! MEI: `[A-Z]{2}\d{8}` (10 chars, first two chars an ISO-3166-1 country
//! code). LEI: `[A-Z0-9]{20}`. EIN: canonical `NN-NNNNNNN`, `NNNNNNNNN`
//! accepted and rewritten. DebtDomainID: `[A-Z0-9]{6,12}`.

use crate::country::is_valid_country_code;
use once_cell::sync::Lazy;
use regex::Regex;

static MEI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9]{8}$").unwrap());
static LEI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{20}$").unwrap());
static EIN_CANONICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{7}$").unwrap());
static EIN_RAW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9}$").unwrap());
static DEBT_DOMAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{6,12}$").unwrap());

/// Canonicalizes a MEI (uppercased) and reports whether its ISO country
/// prefix is recognized. An invalid prefix demotes confidence to 0.5 per
/// invariant (b) but the identifier is not discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMei {
    pub value: String,
    pub confidence: f64,
}

/// Canonicalizes a raw MEI string, returning `None` if it does not match
/// the `[A-Z]{2}\d{8}` shape at all.
pub fn canonicalize_mei(raw: &str) -> Option<CanonicalMei> {
    let upper = raw.trim().to_uppercase();
    if !MEI_RE.is_match(&upper) {
        return None;
    }
    let prefix = &upper[0..2];
    let confidence = if is_valid_country_code(prefix) { 1.0 } else { 0.5 };
    Some(CanonicalMei {
        value: upper,
        confidence,
    })
}

/// Returns the ISO country prefix of a canonical MEI.
pub fn mei_country_prefix(mei: &str) -> &str {
    &mei[0..2.min(mei.len())]
}

/// Canonicalizes a raw LEI string (uppercased, must be 20 alphanumerics).
pub fn canonicalize_lei(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if LEI_RE.is_match(&upper) {
        Some(upper)
    } else {
        None
    }
}

/// Canonicalizes a raw EIN to `NN-NNNNNNN`, accepting either that form or
/// nine bare digits.
pub fn canonicalize_ein(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if EIN_CANONICAL_RE.is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    if EIN_RAW_RE.is_match(trimmed) {
        return Some(format!("{}-{}", &trimmed[0..2], &trimmed[2..9]));
    }
    None
}

/// Hyphen-insensitive EIN equality, per §4.2 (`find_by_ein`) and §4.7
/// (`EIN_MISMATCH*` triggers).
pub fn ein_eq(a: &str, b: &str) -> bool {
    strip_ein_hyphen(a) == strip_ein_hyphen(b)
}

fn strip_ein_hyphen(s: &str) -> String {
    s.chars().filter(|c| *c != '-').collect()
}

/// Canonicalizes a raw DebtDomainID (must be 6-12 alphanumerics, uppercased).
pub fn canonicalize_debt_domain_id(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if DEBT_DOMAIN_RE.is_match(&upper) {
        Some(upper)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mei_valid_country_prefix() {
        let mei = canonicalize_mei("us12345678").unwrap();
        assert_eq!(mei.value, "US12345678");
        assert_eq!(mei.confidence, 1.0);
    }

    #[test]
    fn mei_invalid_country_prefix_demotes_confidence() {
        let mei = canonicalize_mei("zz12345678").unwrap();
        assert_eq!(mei.confidence, 0.5);
    }

    #[test]
    fn mei_rejects_wrong_shape() {
        assert!(canonicalize_mei("US1234567").is_none());
        assert!(canonicalize_mei("123456789A").is_none());
    }

    #[test]
    fn lei_requires_twenty_alnum() {
        assert_eq!(
            canonicalize_lei("529900t8bm49aursdo55"),
            Some("529900T8BM49AURSDO55".to_string())
        );
        assert!(canonicalize_lei("TOO_SHORT").is_none());
    }

    #[test]
    fn ein_rewrites_bare_digits() {
        assert_eq!(canonicalize_ein("123456789"), Some("12-3456789".to_string()));
        assert_eq!(canonicalize_ein("12-3456789"), Some("12-3456789".to_string()));
        assert!(canonicalize_ein("1234567890").is_none());
    }

    #[test]
    fn ein_eq_ignores_hyphen() {
        assert!(ein_eq("12-3456789", "123456789"));
        assert!(!ein_eq("12-3456789", "98-7654321"));
    }

    #[test]
    fn debt_domain_id_bounds() {
        assert!(canonicalize_debt_domain_id("ABC123").is_some());
        assert!(canonicalize_debt_domain_id("AB").is_none());
        assert!(canonicalize_debt_domain_id("THIRTEENCHARS").is_none());
    }
}
