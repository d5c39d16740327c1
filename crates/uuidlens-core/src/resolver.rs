//! Entity resolver client.
//!
//! Cache first, then the authority. Concurrent requests for the same key
//! share one in-flight lookup, and a semaphore caps how many lookups are
//! outstanding at once. Resolution never fails: errors come back as
//! failure-shaped [`ResolvedEntity`] values.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use uuidlens_config::ResolverConfig;

use crate::authority::Authority;
use crate::cache::{CacheKey, ResolutionCache};
use crate::entity::{EntityType, ResolvedEntity};

type InFlight = Shared<BoxFuture<'static, ResolvedEntity>>;

/// Resolves (uuid, type) pairs through the cache and an [`Authority`].
#[derive(Clone)]
pub struct EntityResolver {
    authority: Arc<dyn Authority>,
    cache: Arc<ResolutionCache>,
    in_flight: Arc<Mutex<HashMap<CacheKey, InFlight>>>,
    limiter: Arc<Semaphore>,
    max_concurrency: usize,
    cache_failures: bool,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("authority", &self.authority.name())
            .field("max_concurrency", &self.max_concurrency)
            .field("cache_failures", &self.cache_failures)
            .finish()
    }
}

impl EntityResolver {
    pub fn new(
        authority: Arc<dyn Authority>,
        cache: Arc<ResolutionCache>,
        config: &ResolverConfig,
    ) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            authority,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            limiter: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            cache_failures: config.cache_failures,
        }
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Lookups currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub async fn resolve(&self, uuid: &str, entity_type: EntityType) -> ResolvedEntity {
        let key = CacheKey::new(uuid, entity_type);
        if let Some(hit) = self.cache.get(&key.uuid, entity_type) {
            debug!(uuid = %key.uuid, %entity_type, "Resolution cache hit");
            return hit;
        }

        let lookup = {
            let mut in_flight = self.in_flight.lock();
            // A lookup may have finished between the first check and the lock.
            if let Some(hit) = self.cache.get(&key.uuid, entity_type) {
                return hit;
            }
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(uuid = %key.uuid, %entity_type, "Joining in-flight lookup");
                    existing.clone()
                }
                None => {
                    let lookup = self.fetch(key.clone()).boxed().shared();
                    in_flight.insert(key, lookup.clone());
                    lookup
                }
            }
        };
        lookup.await
    }

    fn fetch(&self, key: CacheKey) -> impl Future<Output = ResolvedEntity> + Send + 'static {
        let authority = self.authority.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();
        let limiter = self.limiter.clone();
        let cache_failures = self.cache_failures;

        async move {
            let _permit = limiter.acquire_owned().await.ok();
            let entity_type = key.entity_type;

            let entity = match authority.lookup(&key.uuid, entity_type).await {
                Ok(record) => {
                    debug!(uuid = %key.uuid, %entity_type, name = %record.name, "Resolved UUID");
                    ResolvedEntity::from_record(&key.uuid, entity_type, record)
                }
                Err(failure) => {
                    warn!(
                        uuid = %key.uuid,
                        %entity_type,
                        authority = authority.name(),
                        "Resolution failed: {}",
                        failure
                    );
                    ResolvedEntity::failed(&key.uuid, entity_type, failure)
                }
            };

            if !entity.is_failure() || cache_failures {
                cache.put(&key.uuid, entity_type, entity.clone());
            }
            in_flight.lock().remove(&key);
            entity
        }
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
