//! Country code recognition: the ISO-3166-1 alpha-2 set, a frozen alias map
//! for common English names, and the ccTLD table used by the email-domain
//! booster (§4.5) and cross-source validator (§4.6).

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// The full ISO-3166-1 alpha-2 set, frozen for test reproducibility.
pub static ISO_3166_1_ALPHA2: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    const CODES: &[&str] = &[
        "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX",
        "AZ", "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ",
        "BR", "BS", "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK",
        "CL", "CM", "CN", "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM",
        "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR",
        "GA", "GB", "GD", "GE", "GF", "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS",
        "GT", "GU", "GW", "GY", "HK", "HM", "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN",
        "IO", "IQ", "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN",
        "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS", "LT", "LU", "LV",
        "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK", "ML", "MM", "MN", "MO", "MP", "MQ",
        "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF", "NG", "NI",
        "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG", "PH", "PK", "PL", "PM",
        "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA", "SB", "SC",
        "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV",
        "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR",
        "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
        "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
    ];
    CODES.iter().copied().collect()
});

/// Frozen alias map covering common English country names.
pub static COUNTRY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("UNITED STATES", "US"),
        ("UNITED STATES OF AMERICA", "US"),
        ("USA", "US"),
        ("U.S.A.", "US"),
        ("U.S.", "US"),
        ("UK", "GB"),
        ("UNITED KINGDOM", "GB"),
        ("GREAT BRITAIN", "GB"),
        ("ENGLAND", "GB"),
        ("SOUTH KOREA", "KR"),
        ("REPUBLIC OF KOREA", "KR"),
        ("NORTH KOREA", "KP"),
        ("RUSSIA", "RU"),
        ("RUSSIAN FEDERATION", "RU"),
        ("UAE", "AE"),
        ("UNITED ARAB EMIRATES", "AE"),
        ("NETHERLANDS", "NL"),
        ("HOLLAND", "NL"),
        ("CZECH REPUBLIC", "CZ"),
        ("CZECHIA", "CZ"),
        ("IVORY COAST", "CI"),
        ("VIETNAM", "VN"),
        ("LAOS", "LA"),
        ("SYRIA", "SY"),
        ("TANZANIA", "TZ"),
        ("BOLIVIA", "BO"),
        ("VENEZUELA", "VE"),
        ("MOLDOVA", "MD"),
        ("MACEDONIA", "MK"),
        ("CAPE VERDE", "CV"),
        ("HONG KONG", "HK"),
        ("TAIWAN", "TW"),
        ("CAYMAN ISLANDS", "KY"),
        ("BRITISH VIRGIN ISLANDS", "VG"),
        ("LUXEMBOURG", "LU"),
        ("SWITZERLAND", "CH"),
        ("IRELAND", "IE"),
        ("SINGAPORE", "SG"),
        ("GERMANY", "DE"),
        ("FRANCE", "FR"),
        ("JAPAN", "JP"),
        ("CHINA", "CN"),
        ("CANADA", "CA"),
        ("AUSTRALIA", "AU"),
        ("BRAZIL", "BR"),
        ("INDIA", "IN"),
        ("MEXICO", "MX"),
    ]
    .into_iter()
    .collect()
});

/// Fixed ccTLD → country table used by the email-domain booster. The
/// generic `.com` TLD is deliberately absent here and special-cased by the
/// caller as `.com ↔ US` (it isn't a ccTLD and mapping it here would wrongly
/// apply to every non-US `.com` domain too).
pub static CC_TLD: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("us", "US"),
        ("uk", "GB"),
        ("co.uk", "GB"),
        ("de", "DE"),
        ("fr", "FR"),
        ("jp", "JP"),
        ("cn", "CN"),
        ("ca", "CA"),
        ("au", "AU"),
        ("br", "BR"),
        ("in", "IN"),
        ("mx", "MX"),
        ("ch", "CH"),
        ("nl", "NL"),
        ("lu", "LU"),
        ("sg", "SG"),
        ("hk", "HK"),
        ("ie", "IE"),
        ("ky", "KY"),
        ("vg", "VG"),
        ("io", "VG"),
    ]
    .into_iter()
    .collect()
});

/// Normalizes a free-text country designation to its ISO-3166-1 alpha-2
/// code, consulting the alias map before falling back to a direct
/// upper-case match against the ISO set.
pub fn resolve_country_code(input: &str) -> Option<String> {
    let upper = input.trim().to_uppercase();
    if upper.len() == 2 && ISO_3166_1_ALPHA2.contains(upper.as_str()) {
        return Some(upper);
    }
    COUNTRY_ALIASES.get(upper.as_str()).map(|s| s.to_string())
}

/// Whether `code` is a recognized ISO-3166-1 alpha-2 country code.
pub fn is_valid_country_code(code: &str) -> bool {
    ISO_3166_1_ALPHA2.contains(code.to_uppercase().as_str())
}
