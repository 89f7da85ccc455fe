//! Confidence scorer.
//!
//! Assembles a candidate's final `[0,100]` score from its accumulated
//! score-components and attached discrepancies, rebuilding the score from
//! scratch rather than layering more deltas on top of whatever the upstream
//! matchers left behind. This is the last step before ranking.

use crate::config::EngineConfig;
use crate::matchers::FuzzyNameMatcher;
use crate::types::{ExtractedEntity, MatchResult, ScoreComponent};
use tracing::instrument;

/// Finalizes a candidate's score from its components, discrepancies, and
/// duplicate count.
pub struct ConfidenceScorer<'a> {
    config: &'a EngineConfig,
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, result, extracted))]
    pub fn finalize(&self, result: &mut MatchResult, extracted: &ExtractedEntity) {
        let identifier_component = self.identifier_component(result);
        let name_component = self.name_component(result, extracted);
        let email_component = result.score_components.get(&ScoreComponent::EmailDomainBoost).copied().unwrap_or(0.0);
        let geographic_component = if self.geographic_consistency_holds(result, extracted) { 10.0 } else { 0.0 };
        let discrepancy_penalty = self.discrepancy_penalty(result);
        let tax_form_component =
            result.score_components.get(&ScoreComponent::TaxFormValidation).copied().unwrap_or(0.0);
        let multi_identifier_bonus = self.multi_identifier_bonus(result);
        let duplicate_penalty = if result.potential_duplicates.is_empty() { 0.0 } else { -5.0 };

        let total = identifier_component
            + name_component
            + email_component
            + geographic_component
            - discrepancy_penalty
            + tax_form_component
            + multi_identifier_bonus
            + duplicate_penalty;

        result.set_component(ScoreComponent::GeographicConsistency, geographic_component);
        result.set_component(ScoreComponent::MultiIdentifierBonus, multi_identifier_bonus);
        result.set_component(ScoreComponent::DuplicatePenalty, duplicate_penalty);
        result.set_component(ScoreComponent::DiscrepancyPenalty, -discrepancy_penalty);
        result.set_score(total);
    }

    /// 40 if `mei_match`, else 35 if `lei_match`, else 30 if `ein_match`,
    /// else 25 if `debt_domain_id_match`, else 0; plus any `*_boost` entries.
    fn identifier_component(&self, result: &MatchResult) -> f64 {
        let components = &result.score_components;
        let base = if components.contains_key(&ScoreComponent::MeiMatch) {
            40.0
        } else if components.contains_key(&ScoreComponent::LeiMatch) {
            35.0
        } else if components.contains_key(&ScoreComponent::EinMatch) {
            30.0
        } else if components.contains_key(&ScoreComponent::DebtDomainIdMatch) {
            25.0
        } else {
            0.0
        };

        let boosts = [
            ScoreComponent::MeiBoost,
            ScoreComponent::LeiBoost,
            ScoreComponent::EinBoost,
            ScoreComponent::DebtDomainIdBoost,
        ]
        .iter()
        .filter_map(|c| components.get(c))
        .sum::<f64>();

        base + boosts
    }

    /// Recomputes the weighted name composite (scaled to a 30-point ceiling)
    /// for every candidate, not just ones admitted through the fuzzy-name
    /// path, so identifier-seeded candidates still get credit or penalty
    /// for how well their name lines up with the extraction.
    fn name_component(&self, result: &MatchResult, extracted: &ExtractedEntity) -> f64 {
        let matcher = FuzzyNameMatcher::new(self.config);
        let (legal, fm) = matcher.raw_scores(extracted, &result.candidate);

        let fraction = if result.is_composite_match {
            if legal >= self.config.composite_legal_floor && fm >= self.config.composite_fm_floor {
                0.7 * legal + 0.3 * fm
            } else {
                legal.min(fm) * 0.5
            }
        } else {
            legal
        };

        fraction * 30.0
    }

    /// Holds if both countries are missing, only one is present (no
    /// contradiction to draw), both extraction and candidate carry MEIs
    /// with equal country prefixes, or the stored country codes agree.
    fn geographic_consistency_holds(&self, result: &MatchResult, extracted: &ExtractedEntity) -> bool {
        let extracted_country = extracted.legal_country.as_deref().and_then(crate::country::resolve_country_code);
        let candidate_country = result.candidate.country_code.as_deref();

        if extracted_country.is_none() || candidate_country.is_none() {
            return true;
        }

        if let (Some(form_mei), Some(store_mei)) = (extracted.mei.as_deref(), result.candidate.mei.as_deref()) {
            let form_prefix = crate::identifiers::mei_country_prefix(&form_mei.to_uppercase());
            let store_prefix = crate::identifiers::mei_country_prefix(&store_mei.to_uppercase());
            if form_prefix.eq_ignore_ascii_case(store_prefix) {
                return true;
            }
        }

        extracted_country.as_deref() == candidate_country
    }

    fn discrepancy_penalty(&self, result: &MatchResult) -> f64 {
        let sum: f64 = result.discrepancies.iter().map(|d| d.severity.penalty().abs()).sum();
        sum.min(50.0)
    }

    /// `5 * (identifier_count - 1)` when more than one identifier axis
    /// matched (a base match plus at least one corroboration boost).
    fn multi_identifier_bonus(&self, result: &MatchResult) -> f64 {
        let matched_axes = [
            (ScoreComponent::MeiMatch, ScoreComponent::MeiBoost),
            (ScoreComponent::LeiMatch, ScoreComponent::LeiBoost),
            (ScoreComponent::EinMatch, ScoreComponent::EinBoost),
            (ScoreComponent::DebtDomainIdMatch, ScoreComponent::DebtDomainIdBoost),
        ];

        let identifier_count = matched_axes
            .iter()
            .filter(|(base, boost)| {
                result.score_components.contains_key(base) || result.score_components.contains_key(boost)
            })
            .count();

        if identifier_count > 1 {
            5.0 * (identifier_count as f64 - 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchStrategy, RecordType, StoreEntity};

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
    fn identifier_only_candidate_scores_from_base_and_name() {
        let config = EngineConfig::default();
        let mut result = MatchResult::new(candidate(), MatchStrategy::Identifier);
        result.set_component(ScoreComponent::MeiMatch, 40.0);

        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US12345678".to_string());
        extracted.legal_name = Some("Acme Fund".to_string());
        extracted.legal_country = Some("US".to_string());

        ConfidenceScorer::new(&config).finalize(&mut result, &extracted);
        // identifier (40) + name (30, perfect standalone match) + geographic (10)
        assert_eq!(result.score(), 80.0);
    }

    #[test]
    fn discrepancy_penalty_is_capped_at_fifty() {
        let config = EngineConfig::default();
        let mut result = MatchResult::new(candidate(), MatchStrategy::Identifier);
        result.set_component(ScoreComponent::MeiMatch, 40.0);
        for _ in 0..5 {
            result.discrepancies.push(crate::types::Discrepancy {
                severity: crate::types::Severity::Critical,
                source: crate::types::DiscrepancySource::IdentifierCheck,
                description: "synthetic".to_string(),
                detail: crate::types::DiscrepancyDetail::OrphanedLocationRecord { entity_id: 1 },
            });
        }

        ConfidenceScorer::new(&config).finalize(&mut result, &ExtractedEntity::empty());
        assert_eq!(result.score(), 0.0); // 40 - min(50, 125) clamps to 0, well below zero anyway
    }

    #[test]
    fn duplicate_penalty_subtracts_five() {
        let config = EngineConfig::default();
        let mut result = MatchResult::new(candidate(), MatchStrategy::Identifier);
        result.set_component(ScoreComponent::MeiMatch, 40.0);
        result.potential_duplicates.push(candidate());

        ConfidenceScorer::new(&config).finalize(&mut result, &ExtractedEntity::empty());
        // identifier (40) + name (0, no legal name supplied) + geographic
        // (10, extracted country missing) - duplicate (5)
        assert_eq!(result.score(), 45.0);
    }
}
