//! Core data model (§3).
//!
//! `MatchResult::score` is a plain field that every scoring step mutates
//! through [`MatchResult::adjust_score`], which clamps to `[0,100]`
//! immediately (invariant (d)). [`MatchResult::confidence_band`] is a
//! derived accessor computed from the current score rather than a stored
//! field, so it can never go stale (Design Notes §9).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A parsed form, immutable after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub legal_name: Option<String>,
    pub fund_manager: Option<String>,
    pub mei: Option<String>,
    pub lei: Option<String>,
    pub ein: Option<String>,
    pub debt_domain_id: Option<String>,
    pub email_domain: Option<String>,
    pub dba: Option<String>,
    pub legal_country: Option<String>,
    pub tax_country: Option<String>,
    pub contact_emails: HashMap<String, String>,
    pub field_confidence: HashMap<String, f64>,
    pub extraction_confidence: f64,
}

impl ExtractedEntity {
    /// A bare extraction with no fields populated, for building up in
    /// tests and fixtures.
    pub fn empty() -> Self {
        Self {
            legal_name: None,
            fund_manager: None,
            mei: None,
            lei: None,
            ein: None,
            debt_domain_id: None,
            email_domain: None,
            dba: None,
            legal_country: None,
            tax_country: None,
            contact_emails: HashMap::new(),
            field_confidence: HashMap::new(),
            extraction_confidence: 1.0,
        }
    }
}

/// Whether a store row is a main customer record or a location sub-entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    Main,
    Location,
}

/// A record from the system of record. Read-only to this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntity {
    pub entity_id: i64,
    pub full_name: String,
    pub short_name: String,
    /// The repurposed "ultimate parent" slot storing the fund manager.
    pub fund_manager_field: Option<String>,
    pub mei: Option<String>,
    pub lei: Option<String>,
    pub ein: Option<String>,
    pub debt_domain_id: Option<String>,
    pub country_code: Option<String>,
    pub legal_address: Option<String>,
    pub tax_address: Option<String>,
    pub record_type: RecordType,
    pub parent_customer_id: Option<i64>,
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

impl StoreEntity {
    pub fn is_location(&self) -> bool {
        self.record_type == RecordType::Location
    }

    /// Alphanumeric-only, lowercase form of `short_name` used for duplicate
    /// detection and `find_by_cleaned_short_name`.
    pub fn cleaned_short_name(&self) -> String {
        self.short_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect()
    }
}

/// Categorical confidence band, a pure function of the final score
/// (invariant (e)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    High,
    MediumHigh,
    Medium,
    Review,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            ConfidenceBand::High
        } else if score >= 85.0 {
            ConfidenceBand::MediumHigh
        } else if score >= 70.0 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Review
        }
    }
}

/// How a candidate first entered the result pool.
///
/// Declaration order doubles as pipeline priority: identifier matches beat
/// fuzzy-name matches beat email-domain baseline candidates at an equal
/// final score, since that is the order in which the engine seeds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStrategy {
    Identifier,
    FuzzyName,
    EmailDomain,
}

/// A typed score-component kind, replacing the source's open-ended
/// string→number map (Design Notes §9). Both the "match" and "boost"
/// concepts are kept per identifier kind, since the spec distinguishes a
/// first-seeded base score from later corroboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreComponent {
    MeiMatch,
    MeiBoost,
    LeiMatch,
    LeiBoost,
    EinMatch,
    EinBoost,
    DebtDomainIdMatch,
    DebtDomainIdBoost,
    LegalNameFuzzy,
    FundManagerFuzzy,
    EmailDomainBoost,
    TaxFormValidation,
    GeographicConsistency,
    MultiIdentifierBonus,
    DuplicatePenalty,
    DiscrepancyPenalty,
}

/// Severity of a [`Discrepancy`], carrying its fixed scoring penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// The penalty applied by the confidence scorer (§4.9 step 5).
    pub fn penalty(self) -> f64 {
        match self {
            Severity::Critical => -25.0,
            Severity::High => -15.0,
            Severity::Medium => -10.0,
            Severity::Low => -5.0,
        }
    }
}

/// Which of the four discrepancy axes a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscrepancySource {
    IdentifierCheck,
    GeographicCheck,
    NameCheck,
    CrossSourceCheck,
    InternalCheck,
}

/// Tagged discrepancy detail, replacing the source's untyped details map
/// (Design Notes §9). Each variant carries exactly the fields its
/// discrepancy type needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyDetail {
    MeiMismatch { form: String, store: String },
    MeiMissingLoaniq { form: String },
    LeiMismatch { form: String, store: String },
    EinMismatch { form: String, store: String },
    DebtDomainIdMismatch { form: String, store: String },
    CountryMismatchMeiAddress { mei_prefix: String, extracted_country: String },
    CountryMismatchFormLoaniq { form: String, store: String },
    CountryMismatchTaxLegal { tax: String, legal: String },
    DbaNotInLoaniq { dba: String },
    FundManagerMismatch { form: String, store: String, similarity: f64 },
    FundManagerMissingLoaniq { form: String },
    UnexpectedFundManagerLoaniq { store: String },
    EinMismatchCrossForm { primary: String, secondary: String },
    LegalNameMismatchCrossForm { primary: String, secondary: String, similarity: f64 },
    CountryMismatchCrossForm { primary: String, secondary: String },
    MeiMismatchCrossForm { primary: String, secondary: String },
    PotentialDuplicateShortName { cleaned_short_name: String, other_entity_ids: Vec<i64> },
    OrphanedLocationRecord { entity_id: i64 },
    InternalCountryMismatch { mei_prefix: String, store_country: String },
}

/// A tagged finding emitted by the discrepancy detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub severity: Severity,
    pub source: DiscrepancySource,
    pub description: String,
    pub detail: DiscrepancyDetail,
}

/// One row in the output: a candidate store entity plus its evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: StoreEntity,
    score: f64,
    pub is_composite_match: bool,
    pub evidence: Vec<String>,
    pub discrepancies: Vec<Discrepancy>,
    pub score_components: HashMap<ScoreComponent, f64>,
    pub strategy: MatchStrategy,
    pub potential_duplicates: Vec<StoreEntity>,
}

impl MatchResult {
    pub fn new(candidate: StoreEntity, strategy: MatchStrategy) -> Self {
        Self {
            candidate,
            score: 0.0,
            is_composite_match: false,
            evidence: Vec::new(),
            discrepancies: Vec::new(),
            score_components: HashMap::new(),
            strategy,
            potential_duplicates: Vec::new(),
        }
    }

    /// Current score, always in `[0,100]` (invariant (d)).
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Sets the score component, adds its value to the running total, and
    /// re-clamps — the only way `score` should ever change.
    pub fn set_component(&mut self, component: ScoreComponent, value: f64) {
        let previous = self.score_components.insert(component, value).unwrap_or(0.0);
        self.score = (self.score - previous + value).clamp(0.0, 100.0);
    }

    /// Adjusts the running score by `delta` without attributing it to a
    /// single component (used for the discrepancy-penalty aggregate and
    /// cross-source sum, which the spec treats as one clamp step).
    pub fn adjust_score(&mut self, delta: f64) {
        self.score = (self.score + delta).clamp(0.0, 100.0);
    }

    /// Directly sets the absolute score (used once by the scorer to
    /// assemble the final value from scratch per §4.9), clamped.
    pub fn set_score(&mut self, score: f64) {
        self.score = score.clamp(0.0, 100.0);
    }

    /// Derived, never stored — recomputed from the current score on every
    /// access so it cannot go stale (Design Notes §9).
    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_score(self.score)
    }

    pub fn has_critical_discrepancy(&self) -> bool {
        self.discrepancies.iter().any(|d| d.severity == Severity::Critical)
    }
}

/// Final categorical outcome of processing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Match,
    ManualReview,
    NoMatch,
    Error,
}

/// Per-form processing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub primary: ExtractedEntity,
    pub secondary: Option<ExtractedEntity>,
    pub ranked_matches: Vec<MatchResult>,
    pub decision: Decision,
    pub audit_trail: Vec<String>,
    #[serde(with = "duration_millis")]
    pub processing_duration: Duration,
    pub metadata: HashMap<String, String>,
}

impl ProcessingResult {
    /// The rank-0 match, if any were found.
    pub fn selected_match(&self) -> Option<&MatchResult> {
        self.ranked_matches.first()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store_entity() -> StoreEntity {
        StoreEntity {
            entity_id: 1,
            full_name: "Acme Fund".to_string(),
            short_name: "ACME".to_string(),
            fund_manager_field: None,
            mei: None,
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
    fn confidence_band_is_pure_function_of_score() {
        let mut result = MatchResult::new(sample_store_entity(), MatchStrategy::Identifier);
        result.set_score(96.0);
        assert_eq!(result.confidence_band(), ConfidenceBand::High);
        result.set_score(90.0);
        assert_eq!(result.confidence_band(), ConfidenceBand::MediumHigh);
        result.set_score(75.0);
        assert_eq!(result.confidence_band(), ConfidenceBand::Medium);
        result.set_score(40.0);
        assert_eq!(result.confidence_band(), ConfidenceBand::Review);
    }

    #[test]
    fn score_clamps_to_unit_range() {
        let mut result = MatchResult::new(sample_store_entity(), MatchStrategy::Identifier);
        result.set_component(ScoreComponent::MeiMatch, 40.0);
        result.adjust_score(1000.0);
        assert_eq!(result.score(), 100.0);
        result.adjust_score(-1000.0);
        assert_eq!(result.score(), 0.0);
    }

    #[test]
    fn set_component_replaces_previous_contribution() {
        let mut result = MatchResult::new(sample_store_entity(), MatchStrategy::Identifier);
        result.set_component(ScoreComponent::MeiMatch, 40.0);
        assert_eq!(result.score(), 40.0);
        result.set_component(ScoreComponent::MeiMatch, 30.0);
        assert_eq!(result.score(), 30.0);
    }

    #[test]
    fn cleaned_short_name_strips_non_alphanumerics() {
        let mut entity = sample_store_entity();
        entity.short_name = "ACME.".to_string();
        assert_eq!(entity.cleaned_short_name(), "acme");
    }
}
