//! Identifier matcher (§4.3).
//!
//! Seeds candidates in strict priority order: MEI, LEI, EIN, DebtDomainID.
//! The first identifier that produces matches assigns each candidate a
//! base score; subsequent identifiers matching an already-seeded candidate
//! apply a corroboration boost instead, capped at 100 by
//! [`crate::types::MatchResult::set_component`]'s clamp.

use crate::error::StoreError;
use crate::identifiers::{canonicalize_debt_domain_id, canonicalize_ein, canonicalize_lei, canonicalize_mei, ein_eq};
use crate::store::RecordStore;
use crate::types::{ExtractedEntity, MatchResult, MatchStrategy, ScoreComponent};
use std::collections::HashMap;
use tracing::{debug, instrument};

const MEI_BASE: f64 = 40.0;
const LEI_BASE: f64 = 35.0;
const EIN_BASE: f64 = 30.0;
const DEBT_DOMAIN_BASE: f64 = 25.0;

/// Corroboration boosts by rank (1st corroborating identifier, 2nd, 3rd),
/// not by identifier kind: whichever identifier is the *first* to
/// corroborate an already-seeded candidate earns 20, the second 15, the
/// third 10, regardless of which of MEI/LEI/EIN/DebtDomainID it is.
const CORROBORATION_BOOSTS: [f64; 3] = [20.0, 15.0, 10.0];

/// Seeds the candidate pool from an extraction's identifiers.
pub struct IdentifierMatcher;

impl IdentifierMatcher {
    /// Queries the store for every identifier present on `extracted`, in
    /// priority order, seeding and corroborating candidates into a
    /// `entity_id -> MatchResult` map (the dedup boundary, invariant (c)).
    #[instrument(skip(self, store, extracted))]
    pub async fn seed_candidates(
        &self,
        store: &dyn RecordStore,
        extracted: &ExtractedEntity,
    ) -> HashMap<i64, MatchResult> {
        let mut pool: HashMap<i64, MatchResult> = HashMap::new();
        let mut corroboration_rank: HashMap<i64, usize> = HashMap::new();

        if let Some(mei) = extracted.mei.as_deref().and_then(|m| canonicalize_mei(m).map(|c| c.value)) {
            self.apply_identifier(
                &mut pool,
                &mut corroboration_rank,
                store.find_by_mei(&mei).await,
                "MEI",
                &mei,
                ScoreComponent::MeiMatch,
                ScoreComponent::MeiBoost,
                MEI_BASE,
            );
        }

        if let Some(lei) = extracted.lei.as_deref().and_then(canonicalize_lei) {
            self.apply_identifier(
                &mut pool,
                &mut corroboration_rank,
                store.find_by_lei(&lei).await,
                "LEI",
                &lei,
                ScoreComponent::LeiMatch,
                ScoreComponent::LeiBoost,
                LEI_BASE,
            );
        }

        if let Some(ein) = extracted.ein.as_deref().and_then(canonicalize_ein) {
            self.apply_identifier(
                &mut pool,
                &mut corroboration_rank,
                store.find_by_ein(&ein).await,
                "EIN",
                &ein,
                ScoreComponent::EinMatch,
                ScoreComponent::EinBoost,
                EIN_BASE,
            );
        }

        if let Some(debt_id) = extracted.debt_domain_id.as_deref().and_then(canonicalize_debt_domain_id) {
            self.apply_identifier(
                &mut pool,
                &mut corroboration_rank,
                store.find_by_debt_domain_id(&debt_id).await,
                "DebtDomainID",
                &debt_id,
                ScoreComponent::DebtDomainIdMatch,
                ScoreComponent::DebtDomainIdBoost,
                DEBT_DOMAIN_BASE,
            );
        }

        pool
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_identifier(
        &self,
        pool: &mut HashMap<i64, MatchResult>,
        corroboration_rank: &mut HashMap<i64, usize>,
        lookup: Result<Vec<crate::types::StoreEntity>, StoreError>,
        id_label: &str,
        value: &str,
        match_component: ScoreComponent,
        boost_component: ScoreComponent,
        base_score: f64,
    ) {
        let candidates = match lookup {
            Ok(rows) => rows,
            Err(err) => {
                debug!(identifier = id_label, error = %err, "store lookup failed, treating as empty");
                return;
            }
        };

        for candidate in candidates {
            let entity_id = candidate.entity_id;
            let is_location = candidate.is_location();

            match pool.get_mut(&entity_id) {
                Some(existing) => {
                    let rank = corroboration_rank.entry(entity_id).or_insert(0);
                    let boost_score = CORROBORATION_BOOSTS
                        .get(*rank)
                        .copied()
                        .unwrap_or(*CORROBORATION_BOOSTS.last().unwrap());
                    *rank += 1;

                    existing.set_component(boost_component, boost_score);
                    existing
                        .evidence
                        .push(format!("{id_label} corroboration boost: {value}"));
                }
                None => {
                    let mut result = MatchResult::new(candidate, MatchStrategy::Identifier);
                    result.set_component(match_component, base_score);
                    result.evidence.push(format!("{id_label} exact match: {value}"));
                    if is_location {
                        result.evidence.push("Match is a location sub-entity".to_string());
                    }
                    pool.insert(entity_id, result);
                }
            }
        }
    }
}

/// EIN equality is hyphen-insensitive even post-canonicalization, used by
/// the cross-source validator and discrepancy detector.
pub fn ein_matches(a: &str, b: &str) -> bool {
    ein_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use crate::types::RecordType;
    use async_trait::async_trait;

    struct FakeStore {
        by_mei: Vec<crate::types::StoreEntity>,
        by_lei: Vec<crate::types::StoreEntity>,
    }

    fn entity(id: i64, mei: Option<&str>, lei: Option<&str>) -> crate::types::StoreEntity {
        crate::types::StoreEntity {
            entity_id: id,
            full_name: "Acme Fund".to_string(),
            short_name: "ACME".to_string(),
            fund_manager_field: None,
            mei: mei.map(String::from),
            lei: lei.map(String::from),
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

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn find_by_mei(&self, _mei: &str) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(self.by_mei.clone())
        }
        async fn find_by_lei(&self, _lei: &str) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(self.by_lei.clone())
        }
        async fn find_by_ein(&self, _ein: &str) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_debt_domain_id(
            &self,
            _id: &str,
        ) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_candidates_by_name(
            &self,
            _legal_name: &str,
            _fund_manager: Option<&str>,
        ) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_email_domain(
            &self,
            _domain: &str,
        ) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_cleaned_short_name(
            &self,
            _cleaned: &str,
        ) -> Result<Vec<crate::types::StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_id(&self, _id: i64) -> Result<Option<crate::types::StoreEntity>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn single_identifier_gets_base_score() {
        let store = FakeStore {
            by_mei: vec![entity(1, Some("US12345678"), None)],
            by_lei: vec![],
        };
        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US12345678".to_string());

        let pool = IdentifierMatcher.seed_candidates(&store, &extracted).await;
        assert_eq!(pool[&1].score(), MEI_BASE);
    }

    #[tokio::test]
    async fn corroborating_identifier_boosts_same_candidate() {
        let store = FakeStore {
            by_mei: vec![entity(1, Some("US12345678"), Some("529900T8BM49AURSDO55"))],
            by_lei: vec![entity(1, Some("US12345678"), Some("529900T8BM49AURSDO55"))],
        };
        let mut extracted = ExtractedEntity::empty();
        extracted.mei = Some("US12345678".to_string());
        extracted.lei = Some("529900T8BM49AURSDO55".to_string());

        let pool = IdentifierMatcher.seed_candidates(&store, &extracted).await;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[&1].score(), MEI_BASE + CORROBORATION_BOOSTS[0]);
    }

    #[tokio::test]
    async fn adding_higher_priority_identifier_never_decreases_score() {
        let store_mei_only = FakeStore {
            by_mei: vec![entity(1, Some("US12345678"), None)],
            by_lei: vec![],
        };
        let mut lei_only = ExtractedEntity::empty();
        lei_only.lei = Some("529900T8BM49AURSDO55".to_string());
        let store_lei_only = FakeStore {
            by_mei: vec![],
            by_lei: vec![entity(1, None, Some("529900T8BM49AURSDO55"))],
        };
        let pool_lei_only = IdentifierMatcher.seed_candidates(&store_lei_only, &lei_only).await;

        let mut both = lei_only.clone();
        both.mei = Some("US12345678".to_string());
        let _ = store_mei_only; // not reused; distinct fixture stores per call
        let store_both = FakeStore {
            by_mei: vec![entity(1, Some("US12345678"), Some("529900T8BM49AURSDO55"))],
            by_lei: vec![entity(1, Some("US12345678"), Some("529900T8BM49AURSDO55"))],
        };
        let pool_both = IdentifierMatcher.seed_candidates(&store_both, &both).await;

        assert!(pool_both[&1].score() >= pool_lei_only[&1].score());
    }
}
