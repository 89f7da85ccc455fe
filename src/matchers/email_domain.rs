//! Email-domain booster (§4.5).
//!
//! Applies an additive, never-penalizing adjustment to an already-seeded
//! candidate based on the extraction's contact email domain. The engine is
//! responsible for using the same domain to pull baseline candidates via
//! [`crate::store::RecordStore::find_by_email_domain`] when the pool is thin;
//! this module only scores the relationship between a domain and a
//! candidate already in hand.

use crate::types::{ExtractedEntity, MatchResult, ScoreComponent, StoreEntity};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::instrument;

const DIRECT_HIT: f64 = 20.0;
const FAMILY_HIT: f64 = 15.0;
const CC_TLD_SOFT: f64 = 5.0;
const FINANCIAL_KEYWORD_SOFT: f64 = 3.0;

/// Maps a brand's public-facing domain root to the name fragments that
/// identify its corporate family in store records, for groups that route
/// email through a different domain than their legal name would suggest.
static DOMAIN_FAMILIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("gs", "goldman sachs"),
        ("blackrock", "blackrock"),
        ("jpmorgan", "jpmorgan"),
        ("jpmchase", "jpmorgan"),
        ("ms", "morgan stanley"),
        ("morganstanley", "morgan stanley"),
        ("bofa", "bank of america"),
        ("bankofamerica", "bank of america"),
        ("citi", "citigroup"),
        ("vanguard", "vanguard"),
        ("fidelity", "fidelity"),
        ("pimco", "pacific investment management"),
        ("ssga", "state street"),
        ("statestreet", "state street"),
    ])
});

const FINANCIAL_KEYWORDS: &[&str] = &[
    "capital", "advisors", "advisers", "invest", "asset", "partners", "fund", "securities", "wealth",
];

/// Scores the relationship between an extraction's email domain and a
/// candidate already in the result pool.
pub struct EmailDomainBooster;

impl EmailDomainBooster {
    /// Applies the boost directly to `result`'s score, per §4.5's rule that
    /// this axis never lowers a score. No-op if the extraction carries no
    /// email domain.
    #[instrument(skip(self, result, extracted))]
    pub fn apply(&self, result: &mut MatchResult, extracted: &ExtractedEntity) {
        let Some(domain) = extracted.email_domain.as_deref() else {
            return;
        };

        let root = domain_root(domain);
        if root.is_empty() {
            return;
        }

        let candidate = &result.candidate;
        let haystack = candidate_haystack(candidate);
        let haystack_no_spaces: String = haystack.chars().filter(|c| !c.is_whitespace()).collect();

        if haystack_no_spaces.contains(&root) {
            result.set_component(ScoreComponent::EmailDomainBoost, DIRECT_HIT);
            result
                .evidence
                .push(format!("email domain root '{root}' found directly in candidate name"));
            return;
        }

        if let Some(family_name) = DOMAIN_FAMILIES.get(root.as_str()) {
            if haystack.contains(family_name) {
                result.set_component(ScoreComponent::EmailDomainBoost, FAMILY_HIT);
                result
                    .evidence
                    .push(format!("email domain '{domain}' matches corporate family '{family_name}'"));
                return;
            }
        }

        let mut soft_boost = 0.0;
        let mut soft_evidence = Vec::new();

        if let Some(tld) = domain.rsplit('.').next() {
            if let Some(country) = candidate.country_code.as_deref() {
                let tld = tld.to_lowercase();
                // "com" isn't a ccTLD; special-cased rather than added to
                // the table so it doesn't falsely match every non-US `.com`.
                let tld_country =
                    if tld == "com" { Some("US") } else { crate::country::CC_TLD.get(tld.as_str()).copied() };
                if tld_country == Some(country) {
                    soft_boost += CC_TLD_SOFT;
                    soft_evidence.push(format!("email TLD '.{tld}' matches candidate country {country}"));
                }
            }
        }

        let domain_has_keyword = FINANCIAL_KEYWORDS.iter().any(|kw| root.contains(kw));
        let candidate_has_keyword = FINANCIAL_KEYWORDS.iter().any(|kw| haystack.contains(kw));
        if domain_has_keyword && candidate_has_keyword {
            soft_boost += FINANCIAL_KEYWORD_SOFT;
            soft_evidence.push("email domain and candidate both contain a financial-services keyword".to_string());
        }

        if soft_boost > 0.0 {
            result.set_component(ScoreComponent::EmailDomainBoost, soft_boost);
            result.evidence.extend(soft_evidence);
        }
    }
}

/// Strips a leading mail subdomain (`mail.`, `smtp.`) and the public suffix,
/// returning the registrable domain's core label, lowercased.
fn domain_root(domain: &str) -> String {
    let domain = domain.to_lowercase();
    let domain = domain.strip_prefix("mail.").unwrap_or(&domain);
    let domain = domain.strip_prefix("smtp.").unwrap_or(domain);

    let labels: Vec<&str> = domain.split('.').collect();
    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_string(),
        _ => labels[labels.len() - 2].to_string(),
    }
}

fn candidate_haystack(candidate: &StoreEntity) -> String {
    let mut s = candidate.full_name.to_lowercase();
    s.push(' ');
    s.push_str(&candidate.short_name.to_lowercase());
    if let Some(fm) = &candidate.fund_manager_field {
        s.push(' ');
        s.push_str(&fm.to_lowercase());
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchStrategy, RecordType};

    fn candidate(full_name: &str, country: Option<&str>) -> StoreEntity {
        StoreEntity {
            entity_id: 1,
            full_name: full_name.to_string(),
            short_name: full_name.to_string(),
            fund_manager_field: None,
            mei: None,
            lei: None,
            ein: None,
            debt_domain_id: None,
            country_code: country.map(String::from),
            legal_address: None,
            tax_address: None,
            record_type: RecordType::Main,
            parent_customer_id: None,
            last_modified: chrono::Utc::now(),
        }
    }

    fn extracted_with_domain(domain: &str) -> ExtractedEntity {
        let mut e = ExtractedEntity::empty();
        e.email_domain = Some(domain.to_string());
        e
    }

    #[test]
    fn direct_domain_substring_hit_stops_at_twenty() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Acme Capital Partners", None), MatchStrategy::Identifier);
        booster.apply(&mut result, &extracted_with_domain("mail.acmecapital.com"));
        assert_eq!(result.score(), DIRECT_HIT);
    }

    #[test]
    fn corporate_family_hit_applies_when_no_direct_substring() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Goldman Sachs Asset Management", None), MatchStrategy::Identifier);
        booster.apply(&mut result, &extracted_with_domain("gs.com"));
        assert_eq!(result.score(), FAMILY_HIT);
    }

    #[test]
    fn no_email_domain_is_a_no_op() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Acme Fund", None), MatchStrategy::Identifier);
        booster.apply(&mut result, &ExtractedEntity::empty());
        assert_eq!(result.score(), 0.0);
    }

    #[test]
    fn cctld_and_keyword_soft_boosts_accumulate() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Widget Capital Holdings", Some("DE")), MatchStrategy::Identifier);
        booster.apply(&mut result, &extracted_with_domain("widget-capital.de"));
        assert_eq!(result.score(), CC_TLD_SOFT + FINANCIAL_KEYWORD_SOFT);
    }

    #[test]
    fn keyword_soft_boost_requires_candidate_to_also_contain_a_keyword() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Unrelated Holdings", Some("DE")), MatchStrategy::Identifier);
        booster.apply(&mut result, &extracted_with_domain("widget-capital.de"));
        assert_eq!(result.score(), CC_TLD_SOFT);
    }

    #[test]
    fn dot_com_domain_matches_us_candidate_via_cctld_special_case() {
        let booster = EmailDomainBooster;
        let mut result = MatchResult::new(candidate("Widget Capital Holdings", Some("US")), MatchStrategy::Identifier);
        booster.apply(&mut result, &extracted_with_domain("widget-capital.com"));
        assert_eq!(result.score(), CC_TLD_SOFT + FINANCIAL_KEYWORD_SOFT);
    }
}
