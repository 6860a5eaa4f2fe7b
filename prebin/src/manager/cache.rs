//! Time-based cache in front of a [`CatalogClient`].
//!
//! Catalogs are a few megabytes each and several commands in one session
//! (install then validate, or a multi-package install) need the same ones.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::package::{Catalog, CatalogSource};

use super::traits::CatalogClient;
use super::ManagerResult;

/// Default cache TTL (5 minutes).
pub const DEFAULT_TTL_SECS: u64 = 300;

#[derive(Clone)]
struct CachedCatalog {
    catalog: Catalog,
    fetched_at: Instant,
}

impl CachedCatalog {
    fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            fetched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// Cache key: the same URL may be published under two labels.
fn cache_key(source: &CatalogSource) -> String {
    format!("{}\n{}", source.label, source.url)
}

/// Caching wrapper for a [`CatalogClient`].
///
/// Thread-safe; clones share the cache.
///
/// # Example
///
/// ```ignore
/// use prebin::manager::{CachedCatalogClient, HttpCatalogClient};
/// use std::time::Duration;
///
/// let cached = CachedCatalogClient::new(HttpCatalogClient::new())
///     .with_ttl(Duration::from_secs(600));
/// let first = cached.fetch_catalog(&source)?;  // network
/// let second = cached.fetch_catalog(&source)?; // cache
/// ```
#[derive(Clone)]
pub struct CachedCatalogClient<C: CatalogClient> {
    inner: C,
    cache: Arc<RwLock<HashMap<String, CachedCatalog>>>,
    ttl: Duration,
}

impl<C: CatalogClient> CachedCatalogClient<C> {
    /// Wrap `inner` with the default TTL.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }

    /// Set the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl<C: CatalogClient> CatalogClient for CachedCatalogClient<C> {
    fn fetch_catalog(&self, source: &CatalogSource) -> ManagerResult<Catalog> {
        if let Ok(cache) = self.cache.read() {
            if let Some(cached) = cache.get(&cache_key(source)) {
                if !cached.is_expired(self.ttl) {
                    tracing::debug!(label = %source.label, "Catalog cache hit");
                    return Ok(cached.catalog.clone());
                }
                tracing::debug!(label = %source.label, "Catalog cache expired");
            }
        }

        let catalog = self.inner.fetch_catalog(source)?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(cache_key(source), CachedCatalog::new(catalog.clone()));
        }

        Ok(catalog)
    }
}
