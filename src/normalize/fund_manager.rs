//! Fund-manager normalization: the general pipeline, then a closed alias
//! map consulted for exact, substring, or reverse-substring hits.

use super::general::normalize_name;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fixed fund-manager alias map: abbreviation/short-form → canonical name,
/// both sides already run through [`normalize_name`].
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("gsam", "goldman sachs asset management"),
        ("pimco", "pacific investment management company"),
        ("blackrock", "blackrock"),
        ("jpmorgan am", "jpmorgan asset management"),
        ("jpm am", "jpmorgan asset management"),
        ("vanguard", "vanguard group"),
        ("fidelity", "fidelity investments"),
        ("tcw", "tcw group"),
        ("pgim", "prudential financial investment management"),
        ("wellington", "wellington management"),
        ("invesco", "invesco"),
        ("aberdeen", "aberdeen standard investments"),
        ("schroders", "schroder investment management"),
        ("amundi", "amundi asset management"),
        ("axa im", "axa investment managers"),
        ("nuveen", "nuveen investments"),
        ("abrdn", "aberdeen standard investments"),
        ("dws", "dws group"),
        ("mfs", "massachusetts financial services"),
        ("oaktree", "oaktree capital management"),
        ("apollo", "apollo global management"),
        ("kkr", "kohlberg kravis roberts"),
        ("ares", "ares management"),
        ("carlyle", "carlyle group"),
        ("blackstone", "blackstone group"),
    ]
    .into_iter()
    .collect()
});

/// Normalizes a fund-manager name: run the general pipeline, then consult
/// the alias map. Exact hit returns the canonical form; otherwise if the
/// normalized input is a substring of any canonical form (or vice versa),
/// that canonical form is returned; otherwise the normalized input itself.
pub fn normalize_fund_manager(input: &str) -> String {
    let normalized = normalize_name(input);

    if let Some(canonical) = ALIASES.get(normalized.as_str()) {
        return canonical.to_string();
    }

    for canonical in ALIASES.values() {
        if canonical.contains(&normalized) || normalized.contains(canonical) {
            return canonical.to_string();
        }
    }

    normalized
}
