use crate::product::Product;
use crate::sheets::FetchError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Cache key under which the full catalogue is stored.
pub const PRODUCTS_KEY: &str = "products";

struct CacheEntry {
    products: Vec<Product>,
    fetched_at: Instant,
}

/// Time-boxed cache over the retrieval service
///
/// An explicit service constructed once at startup and shared by reference,
/// rather than ambient global state: handlers call
/// [`get_or_populate`](ProductCache::get_or_populate) and the refresh
/// endpoint calls [`invalidate`](ProductCache::invalidate).
///
/// There is deliberately no single-flight de-duplication: two requests
/// racing past expiry may both refetch. At catalogue traffic levels the
/// duplicate fetch is harmless and the second result simply overwrites the
/// first.
pub struct ProductCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProductCache {
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        ProductCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached list, or run `populate` and store its result
    ///
    /// Only successful results are cached; a failed populate leaves the
    /// cache untouched so the next call retries.
    ///
    /// # Arguments
    /// * `key` - Cache tag (the catalogue uses [`PRODUCTS_KEY`])
    /// * `populate` - Fallback fetch, run when the entry is missing or stale
    ///
    /// # Returns
    /// * `Result<Vec<Product>, FetchError>` - The cached or freshly fetched
    ///   list, or the populate failure
    pub async fn get_or_populate<F, Fut>(
        &self,
        key: &str,
        populate: F,
    ) -> Result<Vec<Product>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Product>, FetchError>>,
    {
        {
            let entries = self.entries.read().unwrap();
            if let Some(entry) = entries.get(key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.products.clone());
                }
            }
        }

        let products = populate().await?;

        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                products: products.clone(),
                fetched_at: Instant::now(),
            },
        );
        log::debug!("cache entry '{key}' refreshed ({} products)", products.len());

        Ok(products)
    }

    /// Drop an entry so the next call refetches
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        if entries.remove(key).is_some() {
            log::info!("cache entry '{key}' invalidated");
        }
    }
}
