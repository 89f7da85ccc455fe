//! Matching engine orchestrator and batch-processing concurrency model.
//!
//! [`MatchingEngine::find_matches`] is the single public entry point for
//! one record: it runs the identifier matcher, fuzzy-name matcher,
//! email-domain booster, cross-source validator, discrepancy and duplicate
//! detectors, and confidence scorer in that fixed order, then returns the
//! top candidates. [`BatchProcessor`] wraps a `MatchingEngine` with the
//! bounded worker pool, per-record deadline, and graceful shutdown
//! described in the concurrency model.

use crate::config::EngineConfig;
use crate::discrepancy::DiscrepancyDetector;
use crate::duplicate::DuplicateDetector;
use crate::error::{EngineError, ExtractionError};
use crate::matchers::{CrossSourceValidator, EmailDomainBooster, FuzzyNameMatcher, IdentifierMatcher};
use crate::scorer::ConfidenceScorer;
use crate::store::RecordStore;
use crate::types::{Decision, ExtractedEntity, MatchResult, MatchStrategy, ProcessingResult, StoreEntity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

const EMAIL_BASELINE_SCORE: f64 = 60.0;
const EMAIL_BASELINE_CANDIDATE_FLOOR: usize = 3;
const NAME_CANDIDATE_FLOOR: usize = 5;
const TOP_K_FOR_DECISION: usize = 1;

/// The out-of-scope document-extraction collaborator, modeled as a minimal
/// async trait so the concurrency model has something concrete to race.
/// No implementation is provided; document parsing is out of scope.
#[async_trait]
pub trait FormExtractor: Send + Sync {
    async fn extract(&self, raw_form: &str) -> Result<ExtractedEntity, ExtractionError>;
}

/// Runs the full matching pipeline for a single record.
pub struct MatchingEngine<S: RecordStore> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: RecordStore> MatchingEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// `find_matches(primary, secondary) -> ranked list of <=5 Match Results`.
    #[instrument(skip(self, primary, secondary), fields(has_secondary = secondary.is_some()))]
    pub async fn find_matches(
        &self,
        primary: &ExtractedEntity,
        secondary: Option<&ExtractedEntity>,
    ) -> Vec<MatchResult> {
        let mut pool: HashMap<i64, MatchResult> = IdentifierMatcher.seed_candidates(&*self.store, primary).await;

        let name_candidates = if pool.len() < NAME_CANDIDATE_FLOOR {
            self.seed_fuzzy_candidates(&mut pool, primary).await
        } else {
            Vec::new()
        };

        self.apply_email_domain_boosts(&mut pool, primary).await;

        if let Some(secondary) = secondary {
            let validator = CrossSourceValidator;
            for result in pool.values_mut() {
                validator.validate(result, primary, secondary);
            }
        }

        self.detect_discrepancies_and_duplicates(&mut pool, primary, &name_candidates).await;

        let scorer = ConfidenceScorer::new(&self.config);
        for result in pool.values_mut() {
            scorer.finalize(result, primary);
        }

        let mut ranked: Vec<MatchResult> = pool.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.strategy.cmp(&b.strategy))
        });
        ranked.truncate(self.config.top_k);
        ranked
    }

    async fn seed_fuzzy_candidates(
        &self,
        pool: &mut HashMap<i64, MatchResult>,
        primary: &ExtractedEntity,
    ) -> Vec<StoreEntity> {
        let legal_name = primary.legal_name.as_deref().unwrap_or("");
        let name_candidates = match self.store.find_candidates_by_name(legal_name, primary.fund_manager.as_deref()).await
        {
            Ok(rows) => rows,
            Err(err) => {
                debug!(error = %err, "name-candidate query failed, treating as empty");
                Vec::new()
            }
        };

        let matcher = FuzzyNameMatcher::new(&self.config);
        for candidate in &name_candidates {
            if pool.contains_key(&candidate.entity_id) {
                continue;
            }
            if let Some(result) = matcher.score(primary, candidate) {
                pool.insert(candidate.entity_id, result);
            }
        }

        name_candidates
    }

    async fn apply_email_domain_boosts(&self, pool: &mut HashMap<i64, MatchResult>, primary: &ExtractedEntity) {
        let booster = EmailDomainBooster;
        for result in pool.values_mut() {
            booster.apply(result, primary);
        }

        if pool.len() < EMAIL_BASELINE_CANDIDATE_FLOOR {
            if let Some(domain) = primary.email_domain.as_deref() {
                let hits = match self.store.find_by_email_domain(domain).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        debug!(error = %err, "email-domain baseline query failed, treating as empty");
                        Vec::new()
                    }
                };
                for candidate in hits {
                    pool.entry(candidate.entity_id).or_insert_with(|| {
                        let mut result = MatchResult::new(candidate, MatchStrategy::EmailDomain);
                        result.set_score(EMAIL_BASELINE_SCORE);
                        result.evidence.push("baseline candidate from email-domain search".to_string());
                        result
                    });
                }
            }
        }
    }

    async fn detect_discrepancies_and_duplicates(
        &self,
        pool: &mut HashMap<i64, MatchResult>,
        primary: &ExtractedEntity,
        name_candidates: &[StoreEntity],
    ) {
        let detector = DuplicateDetector;
        let discrepancy_detector = DiscrepancyDetector;

        for result in pool.values_mut() {
            let duplicates = detector.find(&*self.store, &result.candidate, name_candidates).await;
            let discrepancies = discrepancy_detector.detect(primary, &result.candidate, &duplicates);
            result.discrepancies.extend(discrepancies);
            result.potential_duplicates = duplicates;
        }
    }
}

/// Derives the categorical decision from the top-ranked match, per the
/// fixed score-band rule. An empty candidate list is a new entity.
pub fn decide(ranked: &[MatchResult]) -> Decision {
    let Some(top) = ranked.first() else {
        return Decision::NoMatch;
    };

    let score = top.score();
    if score >= 85.0 {
        Decision::Match
    } else if score >= 70.0 {
        if top.has_critical_discrepancy() {
            Decision::ManualReview
        } else {
            Decision::Match
        }
    } else if score >= 50.0 {
        Decision::ManualReview
    } else {
        Decision::NoMatch
    }
}

/// Bounds concurrent per-record matching with a worker pool, enforces a
/// per-record deadline, and races the primary/secondary extraction.
pub struct BatchProcessor<S: RecordStore, E: FormExtractor> {
    engine: Arc<MatchingEngine<S>>,
    extractor: Arc<E>,
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl<S: RecordStore + 'static, E: FormExtractor + 'static> BatchProcessor<S, E> {
    pub fn new(engine: Arc<MatchingEngine<S>>, extractor: Arc<E>, config: EngineConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.worker_pool_size));
        Self { engine, extractor, config, semaphore }
    }

    /// Processes a batch of raw forms, pairing each record with an
    /// optional secondary (tax) form, and returns one `ProcessingResult`
    /// per input in the same order. A record whose extraction or matching
    /// does not complete within the per-record deadline yields an `ERROR`
    /// result rather than aborting the batch.
    #[instrument(skip(self, records), fields(batch_size = records.len()))]
    pub async fn process_batch(&self, records: Vec<(String, Option<String>)>) -> Vec<ProcessingResult> {
        let mut handles = Vec::with_capacity(records.len());

        for (primary_form, secondary_form) in records {
            let semaphore = self.semaphore.clone();
            let engine = self.engine.clone();
            let extractor = self.extractor.clone();
            let config = self.config.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return processing_error("worker pool closed"),
                };

                let deadline = config.per_record_timeout;
                match tokio::time::timeout(
                    deadline,
                    process_one(engine, extractor, primary_form, secondary_form, config.secondary_extraction_timeout),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("record matching exceeded its per-record deadline");
                        processing_error("per-record deadline exceeded")
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    warn!(error = %join_err, "worker task panicked");
                    results.push(processing_error("worker task panicked"));
                }
            }
        }
        results
    }

    /// Stops accepting new work and waits up to `grace_period` for
    /// in-flight permits to drain by attempting to acquire every permit
    /// back; any work still outstanding past the grace period is left to
    /// be dropped by its own per-record deadline, and is not reported.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, grace_period: Duration) {
        let total_permits = self.config.worker_pool_size as u32;
        match tokio::time::timeout(grace_period, self.semaphore.acquire_many(total_permits)).await {
            Ok(Ok(_permits)) => info!("batch processor drained cleanly within the grace period"),
            _ => warn!("batch processor shutdown grace period elapsed with workers still in flight"),
        }
    }
}

async fn process_one<S: RecordStore, E: FormExtractor>(
    engine: Arc<MatchingEngine<S>>,
    extractor: Arc<E>,
    primary_form: String,
    secondary_form: Option<String>,
    secondary_timeout: Duration,
) -> ProcessingResult {
    let started = Instant::now();
    let mut audit_trail = Vec::new();

    let primary_extraction = extractor.extract(&primary_form);
    let secondary_extraction = secondary_form
        .as_ref()
        .map(|form| tokio::time::timeout(secondary_timeout, extractor.extract(form)));

    let primary = match secondary_extraction {
        Some(secondary_future) => {
            let (primary_res, secondary_res) = tokio::join!(primary_extraction, secondary_future);
            match primary_res {
                Ok(primary) => {
                    let secondary = match secondary_res {
                        Ok(Ok(secondary)) => Some(secondary),
                        Ok(Err(err)) => {
                            audit_trail.push(format!("secondary extraction failed: {err}"));
                            None
                        }
                        Err(_) => {
                            audit_trail.push("secondary extraction timed out, proceeding with primary only".to_string());
                            None
                        }
                    };
                    return finish(engine, primary, secondary, audit_trail, started).await;
                }
                Err(err) => return processing_error(&format!("primary extraction failed: {err}")),
            }
        }
        None => primary_extraction.await,
    };

    match primary {
        Ok(primary) => finish(engine, primary, None, audit_trail, started).await,
        Err(err) => processing_error(&format!("primary extraction failed: {err}")),
    }
}

async fn finish<S: RecordStore>(
    engine: Arc<MatchingEngine<S>>,
    primary: ExtractedEntity,
    secondary: Option<ExtractedEntity>,
    mut audit_trail: Vec<String>,
    started: Instant,
) -> ProcessingResult {
    let ranked = engine.find_matches(&primary, secondary.as_ref()).await;
    let decision = decide(&ranked);
    audit_trail.push(format!("decision: {decision:?}"));

    ProcessingResult {
        primary,
        secondary,
        ranked_matches: ranked,
        decision,
        audit_trail,
        processing_duration: started.elapsed(),
        metadata: HashMap::new(),
    }
}

fn processing_error(reason: &str) -> ProcessingResult {
    ProcessingResult {
        primary: ExtractedEntity::empty(),
        secondary: None,
        ranked_matches: Vec::new(),
        decision: Decision::Error,
        audit_trail: vec![reason.to_string()],
        processing_duration: Duration::ZERO,
        metadata: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::types::RecordType;

    struct FakeStore {
        by_mei: Vec<StoreEntity>,
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn find_by_mei(&self, _mei: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(self.by_mei.clone())
        }
        async fn find_by_lei(&self, _lei: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_ein(&self, _ein: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_debt_domain_id(&self, _id: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_candidates_by_name(
            &self,
            _legal_name: &str,
            _fund_manager: Option<&str>,
        ) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_email_domain(&self, _domain: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_cleaned_short_name(&self, _cleaned: &str) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_id(&self, _id: i64) -> Result<Option<StoreEntity>, StoreError> {
            Ok(None)
        }
    }

    struct FakeExtractor;

    #[async_trait]
    impl FormExtractor for FakeExtractor {
        async fn extract(&self, raw_form: &str) -> Result<ExtractedEntity, ExtractionError> {
            let mut e = ExtractedEntity::empty();
            e.legal_name = Some(raw_form.to_string());
            Ok(e)
        }
    }

    fn entity(id: i64, mei: &str) -> StoreEntity {
        StoreEntity {
            entity_id: id,
            full_name: "Acme Fund".to_string(),
            short_name: "ACME".to_string(),
            fund_manager_field: None,
            mei: Some(mei.to_string()),
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

    #[tokio::test]
    async fn perfect_mei_match_yields_match_decision() {
        let store = Arc::new(FakeStore { by_mei: vec![entity(1, "US12345678")] });
        let engine = MatchingEngine::new(store, EngineConfig::default());

        let mut primary = ExtractedEntity::empty();
        primary.mei = Some("US12345678".to_string());
        primary.legal_name = Some("Acme Fund".to_string());
        primary.legal_country = Some("US".to_string());

        let ranked = engine.find_matches(&primary, None).await;
        assert_eq!(decide(&ranked), Decision::Match);
    }

    #[tokio::test]
    async fn empty_candidate_pool_is_no_match() {
        let store = Arc::new(FakeStore { by_mei: vec![] });
        let engine = MatchingEngine::new(store, EngineConfig::default());
        let ranked = engine.find_matches(&ExtractedEntity::empty(), None).await;
        assert_eq!(decide(&ranked), Decision::NoMatch);
    }

    #[tokio::test]
    async fn batch_processor_completes_all_records() {
        let store = Arc::new(FakeStore { by_mei: vec![] });
        let engine = Arc::new(MatchingEngine::new(store, EngineConfig::default()));
        let processor = BatchProcessor::new(engine, Arc::new(FakeExtractor), EngineConfig::default());

        let records = vec![("form-a".to_string(), None), ("form-b".to_string(), None)];
        let results = processor.process_batch(records).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.decision != Decision::Error));
    }
}
