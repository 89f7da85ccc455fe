//! Duplicate detector.
//!
//! For a matched candidate, collects potential duplicate store rows by the
//! union of three signals: shared identifiers, a shared cleaned short name,
//! and fuzzy name similarity among the rows already pulled back by the
//! name-candidate query. Results are deduplicated by `entity_id` and never
//! include the candidate itself.

use crate::normalize::{normalize_name, word_multiset};
use crate::store::RecordStore;
use crate::types::StoreEntity;
use std::collections::HashMap;
use tracing::instrument;

/// Finds other store rows that may represent the same real-world entity as
/// a matched candidate.
pub struct DuplicateDetector;

impl DuplicateDetector {
    /// `name_candidates` is the result set already fetched by
    /// `find_candidates_by_name` for this extraction, reused here rather
    /// than re-querying the store.
    #[instrument(skip(self, store, candidate, name_candidates))]
    pub async fn find(
        &self,
        store: &dyn RecordStore,
        candidate: &StoreEntity,
        name_candidates: &[StoreEntity],
    ) -> Vec<StoreEntity> {
        let mut duplicates: HashMap<i64, StoreEntity> = HashMap::new();

        if let Some(mei) = candidate.mei.as_deref() {
            if let Ok(rows) = store.find_by_mei(mei).await {
                for row in rows {
                    duplicates.entry(row.entity_id).or_insert(row);
                }
            }
        }
        if let Some(lei) = candidate.lei.as_deref() {
            if let Ok(rows) = store.find_by_lei(lei).await {
                for row in rows {
                    duplicates.entry(row.entity_id).or_insert(row);
                }
            }
        }
        if let Some(ein) = candidate.ein.as_deref() {
            if let Ok(rows) = store.find_by_ein(ein).await {
                for row in rows {
                    duplicates.entry(row.entity_id).or_insert(row);
                }
            }
        }

        if let Ok(rows) = store.find_by_cleaned_short_name(&candidate.cleaned_short_name()).await {
            for row in rows {
                duplicates.entry(row.entity_id).or_insert(row);
            }
        }

        for row in name_candidates {
            if names_are_similar(&candidate.full_name, &row.full_name) {
                duplicates.entry(row.entity_id).or_insert_with(|| row.clone());
            }
        }

        duplicates.remove(&candidate.entity_id);
        duplicates.into_values().collect()
    }
}

/// Equal after normalization, one contains the other, or their word
/// multisets are equal.
fn names_are_similar(a: &str, b: &str) -> bool {
    let norm_a = normalize_name(a);
    let norm_b = normalize_name(b);

    if norm_a.is_empty() || norm_b.is_empty() {
        return false;
    }

    norm_a == norm_b || norm_a.contains(&norm_b) || norm_b.contains(&norm_a) || word_multiset(&norm_a) == word_multiset(&norm_b)
}
