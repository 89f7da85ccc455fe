//! Engine configuration.
//!
//! Thresholds have fixed defaults; this struct exists so components take
//! configuration explicitly as a field rather than reaching for globals.

use std::time::Duration;

/// Tunable thresholds and concurrency limits for the matching pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Jaro-Winkler floor for a legal-name match to be considered "strong".
    pub legal_name_jw_threshold: f64,
    /// Jaro-Winkler floor for a fund-manager match to be considered "strong".
    pub fund_manager_jw_threshold: f64,
    /// Minimum fund-manager score for the composite "both present" branch.
    pub composite_fm_floor: f64,
    /// Minimum legal-name score for the composite "both present" branch.
    pub composite_legal_floor: f64,
    /// Jaro-Winkler floor for cross-source legal-name corroboration.
    pub cross_source_name_threshold: f64,
    /// Minimum fuzzy score (0-100) for a candidate to be admitted to the pool.
    pub fuzzy_admit_threshold: f64,
    /// Maximum candidates returned by `find_matches`.
    pub top_k: usize,
    /// Bounded worker pool size for batch processing.
    pub worker_pool_size: usize,
    /// Per-record processing deadline.
    pub per_record_timeout: Duration,
    /// Timeout for the secondary (tax-form) extraction race.
    pub secondary_extraction_timeout: Duration,
    /// Grace period for draining in-flight workers on shutdown.
    pub shutdown_grace_period: Duration,
    /// Identifier-lookup cache capacity (soft bound).
    pub cache_capacity: usize,
    /// Identifier-lookup cache freshness window.
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            legal_name_jw_threshold: 0.85,
            fund_manager_jw_threshold: 0.70,
            composite_fm_floor: 0.60,
            composite_legal_floor: 0.70,
            cross_source_name_threshold: 0.85,
            fuzzy_admit_threshold: 50.0,
            top_k: 5,
            worker_pool_size: 4,
            per_record_timeout: Duration::from_secs(60),
            secondary_extraction_timeout: Duration::from_secs(30),
            shutdown_grace_period: Duration::from_secs(60),
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

impl EngineConfig {
    /// Provided for call sites that want to be explicit about using the
    /// defaults rather than relying on `Default`.
    pub fn new() -> Self {
        Self::default()
    }
}
