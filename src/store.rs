//! Record store interface (§4.2) — consumed, not implemented.
//!
//! `RecordStore` models the read-only query surface only; the storage
//! engine itself is an external collaborator. Every method may fail with
//! a [`StoreError`]; per §7 that error is transient and callers degrade to
//! an empty result rather than propagating it.

use crate::error::StoreError;
use crate::types::StoreEntity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// The read-only query surface of the system-of-record database.
///
/// Implementations should cache identifier lookups (see [`CachedStore`])
/// to bound store load; the trait itself makes no assumption about
/// connection lifetime — inject an `Arc<dyn RecordStore>` so the same
/// instance can be shared safely across batch workers (Design Notes §9).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Finds records whose MEI matches either the primary record's field or
    /// a location sub-entity's field.
    async fn find_by_mei(&self, mei: &str) -> Result<Vec<StoreEntity>, StoreError>;

    /// Finds records whose LEI matches either the primary record's field or
    /// a location sub-entity's field.
    async fn find_by_lei(&self, lei: &str) -> Result<Vec<StoreEntity>, StoreError>;

    /// Finds records whose EIN matches either the primary record's field or
    /// a location sub-entity's field. Comparison is hyphen-insensitive.
    async fn find_by_ein(&self, ein: &str) -> Result<Vec<StoreEntity>, StoreError>;

    /// Finds records whose DebtDomainID matches either the primary record's
    /// field or a location sub-entity's field.
    async fn find_by_debt_domain_id(&self, id: &str) -> Result<Vec<StoreEntity>, StoreError>;

    /// Case-insensitive substring match on full_name, short_name, or
    /// fund_manager_field; ordered by (exact full-name match, exact
    /// short-name match, else); capped at 100 by the implementation.
    async fn find_candidates_by_name(
        &self,
        legal_name: &str,
        fund_manager: Option<&str>,
    ) -> Result<Vec<StoreEntity>, StoreError>;

    /// Exact domain match, or substring of the domain-root in full_name or
    /// fund_manager_field.
    async fn find_by_email_domain(&self, domain: &str) -> Result<Vec<StoreEntity>, StoreError>;

    /// Match on the alphanumeric-only, lowercase short_name.
    async fn find_by_cleaned_short_name(
        &self,
        cleaned: &str,
    ) -> Result<Vec<StoreEntity>, StoreError>;

    /// Looks up a single record by primary key.
    async fn find_by_id(&self, id: i64) -> Result<Option<StoreEntity>, StoreError>;
}

/// Which identifier axis a cache entry was keyed on. Cache keys are a
/// `(IdKind, String)` tuple rather than a concatenated string, to avoid
/// collisions between e.g. an EIN and a DebtDomainID that happen to share
/// digits (Design Notes §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Mei,
    Lei,
    Ein,
    DebtDomainId,
}

struct CacheEntry {
    value: Vec<StoreEntity>,
    inserted_at: Instant,
}

/// Decorates any [`RecordStore`] with a process-wide, capacity-bounded,
/// time-to-live cache over the four identifier lookups. Safe to share
/// across workers because each entry is an immutable snapshot populated
/// from a pure function of `(kind, value)`.
pub struct CachedStore<S: RecordStore> {
    inner: S,
    cache: RwLock<HashMap<(IdKind, String), CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl<S: RecordStore> CachedStore<S> {
    pub fn new(inner: S, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    async fn cached_lookup<F, Fut>(
        &self,
        kind: IdKind,
        value: &str,
        fetch: F,
    ) -> Result<Vec<StoreEntity>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<StoreEntity>, StoreError>>,
    {
        let key = (kind, value.to_string());

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.inserted_at.elapsed() < self.ttl {
                    return Ok(entry.value.clone());
                }
            }
        }

        let fresh = fetch().await?;

        let mut cache = self.cache.write().await;
        if cache.len() >= self.capacity && !cache.contains_key(&key) {
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }
        cache.insert(
            key,
            CacheEntry {
                value: fresh.clone(),
                inserted_at: Instant::now(),
            },
        );

        Ok(fresh)
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CachedStore<S> {
    async fn find_by_mei(&self, mei: &str) -> Result<Vec<StoreEntity>, StoreError> {
        self.cached_lookup(IdKind::Mei, mei, || self.inner.find_by_mei(mei)).await
    }

    async fn find_by_lei(&self, lei: &str) -> Result<Vec<StoreEntity>, StoreError> {
        self.cached_lookup(IdKind::Lei, lei, || self.inner.find_by_lei(lei)).await
    }

    async fn find_by_ein(&self, ein: &str) -> Result<Vec<StoreEntity>, StoreError> {
        self.cached_lookup(IdKind::Ein, ein, || self.inner.find_by_ein(ein)).await
    }

    async fn find_by_debt_domain_id(&self, id: &str) -> Result<Vec<StoreEntity>, StoreError> {
        self.cached_lookup(IdKind::DebtDomainId, id, || self.inner.find_by_debt_domain_id(id))
            .await
    }

    async fn find_candidates_by_name(
        &self,
        legal_name: &str,
        fund_manager: Option<&str>,
    ) -> Result<Vec<StoreEntity>, StoreError> {
        // Not identifier-keyed; pass through uncached per the spec, which
        // only calls out identifier lookups for caching.
        self.inner.find_candidates_by_name(legal_name, fund_manager).await
    }

    async fn find_by_email_domain(&self, domain: &str) -> Result<Vec<StoreEntity>, StoreError> {
        self.inner.find_by_email_domain(domain).await
    }

    async fn find_by_cleaned_short_name(
        &self,
        cleaned: &str,
    ) -> Result<Vec<StoreEntity>, StoreError> {
        self.inner.find_by_cleaned_short_name(cleaned).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StoreEntity>, StoreError> {
        self.inner.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStore {
        calls: Arc<AtomicUsize>,
    }

    fn fixture_entity() -> StoreEntity {
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

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn find_by_mei(&self, _mei: &str) -> Result<Vec<StoreEntity>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![fixture_entity()])
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
        async fn find_by_cleaned_short_name(
            &self,
            _cleaned: &str,
        ) -> Result<Vec<StoreEntity>, StoreError> {
            Ok(vec![])
        }
        async fn find_by_id(&self, _id: i64) -> Result<Option<StoreEntity>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn repeated_lookup_hits_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = CachedStore::new(
            CountingStore { calls: calls.clone() },
            1000,
            Duration::from_secs(600),
        );

        store.find_by_mei("US12345678").await.unwrap();
        store.find_by_mei("US12345678").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_kinds_do_not_collide() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = CachedStore::new(
            CountingStore { calls },
            1000,
            Duration::from_secs(600),
        );

        // Same string value looked up under a different axis must not
        // reuse the MEI cache entry.
        let mei_result = store.find_by_mei("12345678AB").await.unwrap();
        let lei_result = store.find_by_lei("12345678AB").await.unwrap();
        assert_ne!(mei_result.len(), 0);
        assert_eq!(lei_result.len(), 0);
    }
}
