//! Reconciles extracted trading-participant entity records against a
//! system-of-record store.
//!
//! The pipeline runs an [`engine::MatchingEngine`] over an
//! [`types::ExtractedEntity`]: seed candidates by identifier, fall back to
//! fuzzy name matching, boost by shared email domain, cross-check against a
//! secondary tax-form extraction when one is available, then detect
//! discrepancies and potential duplicates before scoring and ranking. A
//! [`engine::BatchProcessor`] wraps that per-record pipeline with a bounded
//! worker pool and per-record deadlines for batch ingestion.

pub mod config;
pub mod country;
pub mod discrepancy;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod identifiers;
pub mod matchers;
pub mod normalize;
pub mod scorer;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{decide, BatchProcessor, FormExtractor, MatchingEngine};
pub use error::EngineError;
pub use store::{CachedStore, RecordStore};
pub use types::{
    ConfidenceBand, Decision, Discrepancy, DiscrepancyDetail, DiscrepancySource, ExtractedEntity, MatchResult,
    MatchStrategy, ProcessingResult, RecordType, ScoreComponent, Severity, StoreEntity,
};
