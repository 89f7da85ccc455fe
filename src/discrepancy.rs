//! Discrepancy detector.
//!
//! Emits discrepancies against a single candidate across the IDENTIFIER,
//! GEOGRAPHIC, NAME, and INTERNAL axes from a fixed vocabulary of finding
//! types. The CROSS_SOURCE axis is emitted separately by
//! [`crate::matchers::CrossSourceValidator`], which runs only when a
//! secondary extraction exists; this detector always runs.

use crate::identifiers::{ein_eq, mei_country_prefix};
use crate::normalize::{contains_dba_marker, normalize_fund_manager};
use crate::types::{Discrepancy, DiscrepancyDetail, DiscrepancySource, ExtractedEntity, Severity, StoreEntity};
use tracing::instrument;

const FUND_MANAGER_MISMATCH_JW_THRESHOLD: f64 = 0.70;

/// Checks a single candidate against an extraction for known discrepancy
/// patterns.
pub struct DiscrepancyDetector;

impl DiscrepancyDetector {
    /// `potential_duplicates` is the output of
    /// [`crate::duplicate::DuplicateDetector::find`] for this candidate,
    /// passed in so `POTENTIAL_DUPLICATE_SHORT_NAME` can be derived without
    /// this detector re-querying the store.
    #[instrument(skip(self, extracted, candidate, potential_duplicates))]
    pub fn detect(
        &self,
        extracted: &ExtractedEntity,
        candidate: &StoreEntity,
        potential_duplicates: &[StoreEntity],
    ) -> Vec<Discrepancy> {
        let mut findings = Vec::new();

        self.identifier_axis(extracted, candidate, &mut findings);
        self.geographic_axis(extracted, candidate, &mut findings);
        self.name_axis(extracted, candidate, &mut findings);
        self.internal_axis(candidate, potential_duplicates, &mut findings);

        findings
    }

    fn identifier_axis(&self, extracted: &ExtractedEntity, candidate: &StoreEntity, out: &mut Vec<Discrepancy>) {
        if let (Some(form_mei), Some(store_mei)) = (extracted.mei.as_deref(), candidate.mei.as_deref()) {
            if !form_mei.eq_ignore_ascii_case(store_mei) {
                out.push(Discrepancy {
                    severity: Severity::Critical,
                    source: DiscrepancySource::IdentifierCheck,
                    description: "MEI differs between the extraction and the matched record".to_string(),
                    detail: DiscrepancyDetail::MeiMismatch { form: form_mei.to_string(), store: store_mei.to_string() },
                });
            }
        } else if extracted.mei.is_some() && candidate.mei.is_none() {
            out.push(Discrepancy {
                severity: Severity::High,
                source: DiscrepancySource::IdentifierCheck,
                description: "extraction carries a MEI the matched record lacks".to_string(),
                detail: DiscrepancyDetail::MeiMissingLoaniq { form: extracted.mei.clone().unwrap() },
            });
        }

        if let (Some(form_lei), Some(store_lei)) = (extracted.lei.as_deref(), candidate.lei.as_deref()) {
            if !form_lei.eq_ignore_ascii_case(store_lei) {
                out.push(Discrepancy {
                    severity: Severity::High,
                    source: DiscrepancySource::IdentifierCheck,
                    description: "LEI differs between the extraction and the matched record".to_string(),
                    detail: DiscrepancyDetail::LeiMismatch { form: form_lei.to_string(), store: store_lei.to_string() },
                });
            }
        }

        if let (Some(form_ein), Some(store_ein)) = (extracted.ein.as_deref(), candidate.ein.as_deref()) {
            if !ein_eq(form_ein, store_ein) {
                out.push(Discrepancy {
                    severity: Severity::High,
                    source: DiscrepancySource::IdentifierCheck,
                    description: "EIN differs between the extraction and the matched record".to_string(),
                    detail: DiscrepancyDetail::EinMismatch { form: form_ein.to_string(), store: store_ein.to_string() },
                });
            }
        }

        if let (Some(form_id), Some(store_id)) =
            (extracted.debt_domain_id.as_deref(), candidate.debt_domain_id.as_deref())
        {
            if !form_id.eq_ignore_ascii_case(store_id) {
                out.push(Discrepancy {
                    severity: Severity::Medium,
                    source: DiscrepancySource::IdentifierCheck,
                    description: "DebtDomainID differs between the extraction and the matched record".to_string(),
                    detail: DiscrepancyDetail::DebtDomainIdMismatch {
                        form: form_id.to_string(),
                        store: store_id.to_string(),
                    },
                });
            }
        }
    }

    fn geographic_axis(&self, extracted: &ExtractedEntity, candidate: &StoreEntity, out: &mut Vec<Discrepancy>) {
        if let (Some(mei), Some(extracted_country)) = (extracted.mei.as_deref(), extracted.legal_country.as_deref()) {
            let prefix = mei_country_prefix(&mei.to_uppercase());
            if let Some(resolved) = crate::country::resolve_country_code(extracted_country) {
                if !prefix.eq_ignore_ascii_case(&resolved) {
                    out.push(Discrepancy {
                        severity: Severity::Medium,
                        source: DiscrepancySource::GeographicCheck,
                        description: "MEI country prefix does not match the extracted legal country".to_string(),
                        detail: DiscrepancyDetail::CountryMismatchMeiAddress {
                            mei_prefix: prefix.to_string(),
                            extracted_country: resolved,
                        },
                    });
                }
            }
        }

        if let (Some(extracted_country), Some(store_country)) =
            (extracted.legal_country.as_deref(), candidate.country_code.as_deref())
        {
            if let Some(resolved) = crate::country::resolve_country_code(extracted_country) {
                if !resolved.eq_ignore_ascii_case(store_country) {
                    out.push(Discrepancy {
                        severity: Severity::Medium,
                        source: DiscrepancySource::GeographicCheck,
                        description: "extracted country differs from the matched record's country".to_string(),
                        detail: DiscrepancyDetail::CountryMismatchFormLoaniq {
                            form: resolved,
                            store: store_country.to_string(),
                        },
                    });
                }
            }
        }

        if let (Some(tax), Some(legal)) = (extracted.tax_country.as_deref(), extracted.legal_country.as_deref()) {
            let (tax_resolved, legal_resolved) =
                (crate::country::resolve_country_code(tax), crate::country::resolve_country_code(legal));
            if let (Some(tax_code), Some(legal_code)) = (tax_resolved, legal_resolved) {
                if tax_code != legal_code {
                    out.push(Discrepancy {
                        severity: Severity::Low,
                        source: DiscrepancySource::GeographicCheck,
                        description: "tax country differs from legal country on the same extraction".to_string(),
                        detail: DiscrepancyDetail::CountryMismatchTaxLegal { tax: tax_code, legal: legal_code },
                    });
                }
            }
        }
    }

    fn name_axis(&self, extracted: &ExtractedEntity, candidate: &StoreEntity, out: &mut Vec<Discrepancy>) {
        if let Some(dba) = extracted.dba.as_deref() {
            if !contains_dba_marker(&candidate.full_name) {
                out.push(Discrepancy {
                    severity: Severity::Low,
                    source: DiscrepancySource::NameCheck,
                    description: "extraction carries a DBA the matched record does not reflect".to_string(),
                    detail: DiscrepancyDetail::DbaNotInLoaniq { dba: dba.to_string() },
                });
            }
        }

        match (extracted.fund_manager.as_deref(), candidate.fund_manager_field.as_deref()) {
            (Some(form_fm), Some(store_fm)) => {
                let similarity =
                    strsim::jaro_winkler(&normalize_fund_manager(form_fm), &normalize_fund_manager(store_fm));
                if similarity < FUND_MANAGER_MISMATCH_JW_THRESHOLD {
                    out.push(Discrepancy {
                        severity: Severity::Medium,
                        source: DiscrepancySource::NameCheck,
                        description: "fund manager differs between the extraction and the matched record".to_string(),
                        detail: DiscrepancyDetail::FundManagerMismatch {
                            form: form_fm.to_string(),
                            store: store_fm.to_string(),
                            similarity,
                        },
                    });
                }
            }
            (Some(form_fm), None) => {
                out.push(Discrepancy {
                    severity: Severity::Medium,
                    source: DiscrepancySource::NameCheck,
                    description: "extraction carries a fund manager the matched record lacks".to_string(),
                    detail: DiscrepancyDetail::FundManagerMissingLoaniq { form: form_fm.to_string() },
                });
            }
            (None, Some(store_fm)) => {
                out.push(Discrepancy {
                    severity: Severity::Medium,
                    source: DiscrepancySource::NameCheck,
                    description: "matched record carries a fund manager the extraction does not".to_string(),
                    detail: DiscrepancyDetail::UnexpectedFundManagerLoaniq { store: store_fm.to_string() },
                });
            }
            (None, None) => {}
        }
    }

    fn internal_axis(&self, candidate: &StoreEntity, potential_duplicates: &[StoreEntity], out: &mut Vec<Discrepancy>) {
        // `potential_duplicates` already excludes `candidate` itself (see
        // `DuplicateDetector::find`) and is the union of three signals;
        // narrow to the ones that actually share the cleaned short name
        // before raising this specific discrepancy.
        let short_name = candidate.cleaned_short_name();
        let short_name_collisions: Vec<i64> = potential_duplicates
            .iter()
            .filter(|e| e.cleaned_short_name() == short_name)
            .map(|e| e.entity_id)
            .collect();

        if !short_name_collisions.is_empty() {
            out.push(Discrepancy {
                severity: Severity::Low,
                source: DiscrepancySource::InternalCheck,
                description: "another store row shares this candidate's cleaned short name".to_string(),
                detail: DiscrepancyDetail::PotentialDuplicateShortName {
                    cleaned_short_name: short_name,
                    other_entity_ids: short_name_collisions,
                },
            });
        }

        if candidate.is_location() && candidate.parent_customer_id.is_none() {
            out.push(Discrepancy {
                severity: Severity::Medium,
                source: DiscrepancySource::InternalCheck,
                description: "location record has no parent customer".to_string(),
                detail: DiscrepancyDetail::OrphanedLocationRecord { entity_id: candidate.entity_id },
            });
        }

        if let Some(mei) = candidate.mei.as_deref() {
            if let Some(store_country) = candidate.country_code.as_deref() {
                let prefix = mei_country_prefix(&mei.to_uppercase());
                if !prefix.eq_ignore_ascii_case(store_country) {
                    out.push(Discrepancy {
                        severity: Severity::Medium,
                        source: DiscrepancySource::InternalCheck,
                        description: "matched record's own MEI prefix disagrees with its stored country".to_string(),
                        detail: DiscrepancyDetail::InternalCountryMismatch {
                            mei_prefix: prefix.to_string(),
                            store_country: store_country.to_string(),
                        },
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;

    fn candidate() -> StoreEntity {
        StoreEntity {
            entity_id: 1,
            full_name: "Acme Fund".to_string(),
            short_name: "ACME".to_string(),
            fund_manager_field: None,
            mei: Some("US12345678".to_string()),
            lei: None,
            ein: None,
            debt_domain_id: None,
            country_code: Some("US".to_string()),
            legal_address: None,
            tax_address: None,
            record_type: RecordType::Main,
            parent_customer_id: None,
            last_modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn mei_mismatch_is_critical() {
        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US87654321".to_string());
        let findings = DiscrepancyDetector.detect(&extracted, &candidate(), &[]);
        assert!(findings
            .iter()
            .any(|d| matches!(d.detail, DiscrepancyDetail::MeiMismatch { .. }) && d.severity == Severity::Critical));
    }

    #[test]
    fn orphaned_location_record_detected() {
        let mut loc = candidate();
        loc.record_type = RecordType::Location;
        loc.parent_customer_id = None;
        let findings = DiscrepancyDetector.detect(&ExtractedEntity::empty(), &loc, &[]);
        assert!(findings.iter().any(|d| matches!(d.detail, DiscrepancyDetail::OrphanedLocationRecord { .. })));
    }

    #[test]
    fn internal_country_mismatch_detected() {
        let mut mismatched = candidate();
        mismatched.mei = Some("DE12345678".to_string());
        mismatched.country_code = Some("US".to_string());
        let findings = DiscrepancyDetector.detect(&ExtractedEntity::empty(), &mismatched, &[]);
        assert!(findings.iter().any(|d| matches!(d.detail, DiscrepancyDetail::InternalCountryMismatch { .. })));
    }

    #[test]
    fn no_discrepancies_for_clean_match() {
        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US12345678".to_string());
        extracted.legal_country = Some("US".to_string());
        let findings = DiscrepancyDetector.detect(&extracted, &candidate(), &[]);
        assert!(findings.is_empty());
    }

    #[test]
    fn single_short_name_collision_is_reported() {
        let mut other = candidate();
        other.entity_id = 2;
        other.short_name = "ACME.".to_string();

        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US12345678".to_string());
        extracted.legal_country = Some("US".to_string());

        let findings = DiscrepancyDetector.detect(&extracted, &candidate(), std::slice::from_ref(&other));
        assert!(findings.iter().any(|d| matches!(
            d.detail,
            DiscrepancyDetail::PotentialDuplicateShortName { ref other_entity_ids, .. } if other_entity_ids == &[2]
        )));
    }

    #[test]
    fn duplicate_not_sharing_short_name_is_not_reported() {
        let mut other = candidate();
        other.entity_id = 2;
        other.short_name = "DIFFERENT".to_string();

        let findings = DiscrepancyDetector.detect(&ExtractedEntity::empty(), &candidate(), std::slice::from_ref(&other));
        assert!(!findings.iter().any(|d| matches!(d.detail, DiscrepancyDetail::PotentialDuplicateShortName { .. })));
    }
}
