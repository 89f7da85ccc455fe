//! Error taxonomy.
//!
//! Three classes per the design: transient store errors (never bubble out
//! of a matching component — callers degrade to an empty result),
//! record-level failures (become an `ERROR` `ProcessingResult`), and
//! programmer errors / invariant violations (fail fast via `debug_assert!`
//! at the boundary where the invariant is established).

use thiserror::Error;

/// Errors surfaced by a [`crate::store::RecordStore`] implementation.
///
/// Every variant here is transient by contract: a component that receives
/// one logs it and treats the lookup as having returned no rows. It must
/// never propagate out of [`crate::engine::MatchingEngine::find_matches`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("record store query failed: {0}")]
    QueryFailed(String),

    #[error("record store query timed out")]
    Timeout,
}

/// Errors surfaced by the out-of-scope form-extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("extraction timed out")]
    Timeout,
}

/// Record-level failures during orchestration.
///
/// These are caught at the worker boundary and converted into an `ERROR`
/// [`crate::types::ProcessingResult`] rather than failing the whole batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("per-record deadline exceeded")]
    DeadlineExceeded,

    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}
