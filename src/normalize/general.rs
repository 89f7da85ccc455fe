//! General legal-name normalization.
//!
//! A deterministic eight-step pipeline: diacritic removal, punctuation/
//! whitespace folding, case-folding, character filtering, abbreviation
//! expansion, corporate-form stripping, stopword stripping, whitespace
//! collapsing. The corporate-form set and abbreviation map are frozen for
//! test reproducibility.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

/// Fixed abbreviation expansions, consulted after ASCII folding and
/// case-folding but before corporate-form stripping (so e.g. `intl corp`
/// expands to `international corp` and then loses `corp`).
static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("intl", "international"),
        ("mgmt", "management"),
        ("mgr", "manager"),
        ("natl", "national"),
        ("assoc", "associates"),
        ("assn", "association"),
        ("bros", "brothers"),
        ("co", "company"),
        ("corp", "corporation"),
        ("dept", "department"),
        ("dev", "development"),
        ("dist", "district"),
        ("div", "division"),
        ("eng", "engineering"),
        ("fin", "financial"),
        ("fund", "fund"),
        ("grp", "group"),
        ("hldg", "holding"),
        ("hldgs", "holdings"),
        ("inc", "incorporated"),
        ("indus", "industries"),
        ("inv", "investment"),
        ("invs", "investments"),
        ("lab", "laboratory"),
        ("labs", "laboratories"),
        ("mfg", "manufacturing"),
        ("prop", "property"),
        ("props", "properties"),
        ("svc", "service"),
        ("svcs", "services"),
        ("tech", "technology"),
    ]
    .into_iter()
    .collect()
});

/// Closed set of corporate-form words stripped after abbreviation
/// expansion: US forms, international forms, and investment-vehicle forms.
static CORPORATE_FORMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // US forms
        "incorporated",
        "corporation",
        "company",
        "llc",
        "llp",
        "lllp",
        "lp",
        "ltd",
        "pllc",
        "pc",
        "pa",
        "co",
        "corp",
        "inc",
        // International forms
        "gmbh",
        "ag",
        "sa",
        "sas",
        "sarl",
        "srl",
        "spa",
        "bv",
        "nv",
        "oy",
        "ab",
        "as",
        "aps",
        "kk",
        "plc",
        "pty",
        "sdn",
        "bhd",
        "kg",
        "ohg",
        "se",
        "sce",
        "scs",
        "eurl",
        "snc",
        "kft",
        "zrt",
        "doo",
        "dooel",
        "ood",
        "eood",
        "sp",
        "zoo",
        "sro",
        "as2",
        // Investment-vehicle forms
        "fund",
        "lp1",
        "feeder",
        "master",
        "spc",
        "spv",
        "scsp",
        "sicav",
        "sicaf",
        "fcp",
        "oeic",
        "reit",
        "trust",
        "tr",
        "plc2",
        "gp",
        "aiv",
        "unittrust",
        "icav",
    ]
    .into_iter()
    .collect()
});

/// Closed stopword set of articles/prepositions stripped last.
static STOPWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["the", "a", "an", "of", "and", "for", "de", "la"].into_iter().collect());

/// Folds smart quotes, dashes, and exotic whitespace to ASCII equivalents;
/// strips control and zero-width codepoints.
fn fold_punctuation(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => {
                out.push(' ')
            }
            '\u{200B}'..='\u{200D}' | '\u{FEFF}' => {} // zero-width, dropped
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Strips diacritics via compatibility decomposition followed by removal of
/// combining marks, yielding ASCII-approximate letters.
fn strip_diacritics(input: &str) -> String {
    input.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

fn expand_abbreviations(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .map(|t| {
            ABBREVIATIONS
                .get(t.as_str())
                .map(|expanded| expanded.to_string())
                .unwrap_or(t)
        })
        .collect()
}

/// Runs the full eight-step general name normalization pipeline.
///
/// Idempotent: `normalize_name(normalize_name(x)) == normalize_name(x)`,
/// since every step operates on an already-lowercased, already-filtered,
/// already-collapsed string without reintroducing characters the filter
/// would remove.
pub fn normalize_name(input: &str) -> String {
    let step1 = strip_diacritics(input);
    let step2 = fold_punctuation(&step1);
    let step3 = step2.to_lowercase();
    let step4: String = step3
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '\'')
        .collect();

    let tokens: Vec<String> = step4.split_whitespace().map(|s| s.to_string()).collect();
    let tokens = expand_abbreviations(tokens);
    let tokens: Vec<String> = tokens
        .into_iter()
        .filter(|t| !CORPORATE_FORMS.contains(t.as_str()))
        .filter(|t| !STOPWORDS.contains(t.as_str()))
        .collect();

    tokens.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenizes a normalized name into a sorted multiset for word-set
/// equality comparisons.
pub fn word_multiset(normalized: &str) -> Vec<&str> {
    let mut words: Vec<&str> = normalized.split_whitespace().collect();
    words.sort_unstable();
    words
}
