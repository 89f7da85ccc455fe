//! Cross-source validator.
//!
//! Runs only when a secondary (tax-form) extraction accompanies the
//! primary one, corroborating or contradicting the primary match across
//! five independent axes: EIN, MEI, legal name, country, and complementary
//! identifiers. Each scored axis contributes an independently-derived
//! delta; the sum feeds the `tax_form_validation` score component, clamped
//! to [0,100] as it is applied. The MEI axis carries no delta of its own
//! (§4.6 names none) but is the only place both extractions are in scope
//! together, so it is where `MEI_MISMATCH_CROSS_FORM` is raised.

use crate::identifiers::{canonicalize_ein, canonicalize_mei, ein_eq};
use crate::normalize::normalize_name;
use crate::types::{
    Discrepancy, DiscrepancyDetail, DiscrepancySource, ExtractedEntity, MatchResult, ScoreComponent, Severity,
    StoreEntity,
};
use tracing::instrument;

/// Cross-checks a primary match against a secondary extraction.
pub struct CrossSourceValidator;

impl CrossSourceValidator {
    /// Adds the `tax_form_validation` component to `result`, summing all
    /// five axes.
    #[instrument(skip(self, result, primary, secondary))]
    pub fn validate(&self, result: &mut MatchResult, primary: &ExtractedEntity, secondary: &ExtractedEntity) {
        let mut total = 0.0;

        total += self.ein_axis(result, primary, secondary);
        total += self.mei_axis(result, primary, secondary);
        total += self.legal_name_axis(result, primary, secondary);
        total += self.country_axis(result, primary, secondary);
        total += self.complementary_identifier_axis(result, primary, secondary);

        result.set_component(ScoreComponent::TaxFormValidation, total);
    }

    /// Both present and unequal: a CRITICAL `MEI_MISMATCH_CROSS_FORM`
    /// discrepancy. This axis carries no direct `tax_form_validation`
    /// delta of its own — like the other cross-form mismatches, its
    /// severity feeds the scorer's general discrepancy penalty (§4.9
    /// step 5) — since §4.6 names no separate MEI bonus/penalty.
    fn mei_axis(&self, result: &mut MatchResult, primary: &ExtractedEntity, secondary: &ExtractedEntity) -> f64 {
        let (Some(p), Some(s)) = (primary.mei.as_deref(), secondary.mei.as_deref()) else {
            return 0.0;
        };

        let (Some(p_canon), Some(s_canon)) =
            (canonicalize_mei(p).map(|c| c.value), canonicalize_mei(s).map(|c| c.value))
        else {
            return 0.0;
        };

        if !p_canon.eq_ignore_ascii_case(&s_canon) {
            result.discrepancies.push(Discrepancy {
                severity: Severity::Critical,
                source: DiscrepancySource::CrossSourceCheck,
                description: "MEI differs between primary and secondary forms".to_string(),
                detail: DiscrepancyDetail::MeiMismatchCrossForm { primary: p_canon, secondary: s_canon },
            });
        }

        0.0
    }

    /// Both present and equal: +10. Both present and unequal: -15 and a
    /// CRITICAL discrepancy. Only the tax form carries one: +5, plus +10
    /// more if it equals the candidate's own EIN, or -10 and a HIGH
    /// discrepancy if it doesn't.
    fn ein_axis(&self, result: &mut MatchResult, primary: &ExtractedEntity, secondary: &ExtractedEntity) -> f64 {
        match (primary.ein.as_deref(), secondary.ein.as_deref()) {
            (Some(p), Some(s)) => {
                let (Some(p_canon), Some(s_canon)) = (canonicalize_ein(p), canonicalize_ein(s)) else {
                    return 0.0;
                };
                if ein_eq(&p_canon, &s_canon) {
                    result.evidence.push("cross-form EIN agreement".to_string());
                    10.0
                } else {
                    result.discrepancies.push(Discrepancy {
                        severity: Severity::Critical,
                        source: DiscrepancySource::CrossSourceCheck,
                        description: "EIN differs between primary and secondary forms".to_string(),
                        detail: DiscrepancyDetail::EinMismatchCrossForm { primary: p_canon, secondary: s_canon },
                    });
                    -15.0
                }
            }
            (None, Some(s)) => {
                let Some(s_canon) = canonicalize_ein(s) else {
                    return 0.0;
                };
                let mut delta = 5.0;
                match result.candidate.ein.as_deref().and_then(canonicalize_ein) {
                    Some(candidate_ein) if ein_eq(&candidate_ein, &s_canon) => {
                        delta += 10.0;
                        result.evidence.push("tax-form EIN corroborates candidate record".to_string());
                    }
                    Some(candidate_ein) => {
                        delta -= 10.0;
                        result.discrepancies.push(Discrepancy {
                            severity: Severity::High,
                            source: DiscrepancySource::CrossSourceCheck,
                            description: "tax-form EIN differs from the matched candidate's EIN".to_string(),
                            detail: DiscrepancyDetail::EinMismatch { form: s_canon, store: candidate_ein },
                        });
                    }
                    None => {}
                }
                delta
            }
            _ => 0.0,
        }
    }

    /// JW over the two form names: >0.9 -> +8, >0.8 -> +3, <0.7 -> -10 and a
    /// HIGH discrepancy. Additionally, if the tax-form legal name matches
    /// the candidate's own full name with JW >0.85, +5 more.
    fn legal_name_axis(&self, result: &mut MatchResult, primary: &ExtractedEntity, secondary: &ExtractedEntity) -> f64 {
        let mut delta = 0.0;

        if let (Some(p), Some(s)) = (primary.legal_name.as_deref(), secondary.legal_name.as_deref()) {
            let similarity = strsim::jaro_winkler(&normalize_name(p), &normalize_name(s));
            if similarity > 0.9 {
                result.evidence.push(format!("cross-form legal name agreement ({similarity:.2})"));
                delta += 8.0;
            } else if similarity > 0.8 {
                delta += 3.0;
            } else if similarity < 0.7 {
                result.discrepancies.push(Discrepancy {
                    severity: Severity::High,
                    source: DiscrepancySource::CrossSourceCheck,
                    description: "legal name differs between primary and secondary forms".to_string(),
                    detail: DiscrepancyDetail::LegalNameMismatchCrossForm {
                        primary: p.to_string(),
                        secondary: s.to_string(),
                        similarity,
                    },
                });
                delta -= 10.0;
            }
        }

        if let Some(s) = secondary.legal_name.as_deref() {
            let similarity = strsim::jaro_winkler(&normalize_name(s), &normalize_name(&result.candidate.full_name));
            if similarity > 0.85 {
                delta += 5.0;
            }
        }

        delta
    }

    /// Both present and unequal: -5 and a MEDIUM discrepancy. Both present
    /// and equal: +2.
    fn country_axis(&self, result: &mut MatchResult, primary: &ExtractedEntity, secondary: &ExtractedEntity) -> f64 {
        let (Some(p), Some(s)) = (primary.legal_country.as_deref(), secondary.tax_country.as_deref()) else {
            return 0.0;
        };

        match (crate::country::resolve_country_code(p), crate::country::resolve_country_code(s)) {
            (Some(p_code), Some(s_code)) if p_code == s_code => {
                result.evidence.push(format!("cross-form country agreement ({p_code})"));
                2.0
            }
            (Some(p_code), Some(s_code)) => {
                result.discrepancies.push(Discrepancy {
                    severity: Severity::Medium,
                    source: DiscrepancySource::CrossSourceCheck,
                    description: "legal and tax country differ across forms".to_string(),
                    detail: DiscrepancyDetail::CountryMismatchCrossForm { primary: p_code, secondary: s_code },
                });
                -5.0
            }
            _ => 0.0,
        }
    }

    /// If the tax form carries an LEI the primary lacks and it equals the
    /// candidate's LEI: +15. Same rule for DebtDomainID: +10.
    fn complementary_identifier_axis(
        &self,
        result: &mut MatchResult,
        primary: &ExtractedEntity,
        secondary: &ExtractedEntity,
    ) -> f64 {
        let mut delta = 0.0;
        let candidate = &result.candidate;

        if let (None, Some(s_lei)) = (primary.lei.as_deref(), secondary.lei.as_deref()) {
            if candidate.lei.as_deref().map(|c| c.eq_ignore_ascii_case(s_lei)) == Some(true) {
                delta += 15.0;
            }
        }

        if let (None, Some(s_debt_id)) = (primary.debt_domain_id.as_deref(), secondary.debt_domain_id.as_deref()) {
            if candidate.debt_domain_id.as_deref().map(|c| c.eq_ignore_ascii_case(s_debt_id)) == Some(true) {
                delta += 10.0;
            }
        }

        delta
    }
}
