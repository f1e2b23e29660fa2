//! Memoising provider wrapper.
//!
//! Each fixpoint iteration rebuilds the candidate graph from scratch. Wrapping
//! the provider in a [`CachingProvider`] keeps those rebuilds from fetching
//! the same metadata again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use platoon_core::identity::ModuleIdentity;
use platoon_core::requirement::VersionRequirement;

use crate::provider::{LookupResult, MetadataProvider};

type CacheKey = (ModuleIdentity, VersionRequirement);

/// Caches every lookup result, failures included, per module and requirement.
#[derive(Debug)]
pub struct CachingProvider<P> {
    inner: P,
    entries: Mutex<HashMap<CacheKey, LookupResult>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<P: MetadataProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups forwarded to the wrapped provider.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<P: MetadataProvider> MetadataProvider for CachingProvider<P> {
    fn lookup(
        &self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
    ) -> impl Future<Output = LookupResult> + Send {
        async move {
            let key = (id.clone(), requirement.clone());
            if let Some(hit) = self.entries.lock().await.get(&key).cloned() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return hit;
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            let result = self.inner.lookup(id, requirement).await;
            self.entries.lock().await.insert(key, result.clone());
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::provider::InMemoryProvider;
    use platoon_core::descriptor::ModuleCatalog;
    use platoon_core::version::MavenScheme;

    #[tokio::test]
    async fn repeated_lookups_hit_cache() {
        let catalog = ModuleCatalog::parse_toml("[[module]]\nid = \"org:lib:1.0\"\n").unwrap();
        let cache = CachingProvider::new(InMemoryProvider::new(catalog, Arc::new(MavenScheme)));
        let id = ModuleIdentity::new("org", "lib");
        let req = VersionRequirement::Exact("1.0".into());

        assert!(cache.lookup(&id, &req).await.unwrap().is_some());
        assert!(cache.lookup(&id, &req).await.unwrap().is_some());
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);

        // Not-found results are cached too.
        let missing = VersionRequirement::Exact("9.0".into());
        assert!(cache.lookup(&id, &missing).await.unwrap().is_none());
        assert!(cache.lookup(&id, &missing).await.unwrap().is_none());
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 2);
    }
}
