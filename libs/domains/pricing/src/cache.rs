//! Process-wide catalog cache keyed by (service, region).
//!
//! - Entries younger than the TTL are served directly; older ones count as misses.
//! - Concurrent misses for one key share a single fetch+build (single-flight).
//! - The build task installs its own result, so it completes even if every
//!   caller waiting on it goes away.
//! - A transport failure is retried once; if it persists and an older entry
//!   exists, that entry is served with `stale = true`.
//! - After such a failure the stale entry is served without refetching until
//!   the failure backoff elapses. `refresh` ignores the backoff.
//! - A build that panics resolves to `BuildAborted` and still clears its
//!   in-flight marker, so the next lookup starts over.
//! - Least-recently-used entries are evicted beyond `max_entries`.

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use observability::CatalogMetrics;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::catalog::CatalogIndex;
use crate::error::CatalogError;
use crate::fetcher::PriceListFetcher;
use crate::models::Freshness;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub service_code: String,
    pub region: String,
}

impl CacheKey {
    pub fn new(service_code: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service_code: service_code.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service_code, self.region)
    }
}

/// A resolved catalog and whether it outlived its TTL
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub index: Arc<CatalogIndex>,
    pub stale: bool,
}

impl CatalogSnapshot {
    pub fn freshness(&self) -> Freshness {
        self.index.freshness(self.stale)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CachedCatalog {
    pub key: String,
    pub records: usize,
    pub age_secs: u64,
    pub idle_secs: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    /// Most recently used first
    pub catalogs: Vec<CachedCatalog>,
}

struct CacheEntry {
    index: Arc<CatalogIndex>,
    installed_at: Instant,
    last_access: Instant,
    /// Last transport failure while rebuilding this entry
    failed_at: Option<Instant>,
}

type BuildResult = Result<Arc<CatalogIndex>, CatalogError>;
type SharedBuild = Shared<BoxFuture<'static, BuildResult>>;

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, SharedBuild>,
}

pub struct CatalogCache<F: PriceListFetcher> {
    fetcher: Arc<F>,
    ttl: Duration,
    failure_backoff: Duration,
    max_entries: NonZeroUsize,
    state: Arc<Mutex<CacheState>>,
}

impl<F: PriceListFetcher> Clone for CatalogCache<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            ttl: self.ttl,
            failure_backoff: self.failure_backoff,
            max_entries: self.max_entries,
            state: Arc::clone(&self.state),
        }
    }
}

impl<F: PriceListFetcher + 'static> CatalogCache<F> {
    pub fn new(fetcher: Arc<F>, ttl: Duration, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            fetcher,
            ttl,
            failure_backoff: Duration::ZERO,
            max_entries,
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(max_entries),
                in_flight: HashMap::new(),
            })),
        }
    }

    /// Serve an expired entry without refetching for `backoff` after a transport failure.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Fresh entry if one exists, otherwise join or start a build.
    pub async fn get_or_build(
        &self,
        service_code: &str,
        region: &str,
    ) -> Result<CatalogSnapshot, CatalogError> {
        self.resolve(CacheKey::new(service_code, region), false).await
    }

    /// Rebuild regardless of TTL, with the same single-flight and stale rules.
    pub async fn refresh(
        &self,
        service_code: &str,
        region: &str,
    ) -> Result<CatalogSnapshot, CatalogError> {
        self.resolve(CacheKey::new(service_code, region), true).await
    }

    /// Drop an entry. In-flight builds are unaffected and will install on completion.
    pub async fn invalidate(&self, service_code: &str, region: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state
            .entries
            .pop(&CacheKey::new(service_code, region))
            .is_some();
        CatalogMetrics::set_cache_entries(state.entries.len());
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            max_entries: self.max_entries.get(),
            ttl_secs: self.ttl.as_secs(),
            catalogs: state
                .entries
                .iter()
                .map(|(key, entry)| CachedCatalog {
                    key: key.to_string(),
                    records: entry.index.len(),
                    age_secs: entry.installed_at.elapsed().as_secs(),
                    idle_secs: entry.last_access.elapsed().as_secs(),
                })
                .collect(),
        }
    }

    async fn resolve(&self, key: CacheKey, force: bool) -> Result<CatalogSnapshot, CatalogError> {
        let build = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;

            if !force {
                if let Some(entry) = state.entries.get_mut(&key) {
                    if entry.installed_at.elapsed() < self.ttl {
                        entry.last_access = Instant::now();
                        CatalogMetrics::record_cache_hit(&key.service_code, &key.region);
                        return Ok(CatalogSnapshot {
                            index: Arc::clone(&entry.index),
                            stale: false,
                        });
                    }
                    if entry
                        .failed_at
                        .is_some_and(|failed| failed.elapsed() < self.failure_backoff)
                    {
                        debug!(key = %key, "Serving stale catalog during failure backoff");
                        entry.last_access = Instant::now();
                        CatalogMetrics::record_stale_served(&key.service_code, &key.region);
                        return Ok(CatalogSnapshot {
                            index: Arc::clone(&entry.index),
                            stale: true,
                        });
                    }
                }
                CatalogMetrics::record_cache_miss(&key.service_code, &key.region);
            }

            match state.in_flight.get(&key) {
                Some(build) => {
                    debug!(key = %key, "Joining in-flight catalog build");
                    build.clone()
                }
                None => {
                    let build = self.start_build(key.clone());
                    state.in_flight.insert(key.clone(), build.clone());
                    build
                }
            }
        };

        match build.await {
            Ok(index) => Ok(CatalogSnapshot { index, stale: false }),
            Err(CatalogError::Fetch(err)) if err.is_retryable() => {
                let mut state = self.state.lock().await;
                match state.entries.get_mut(&key) {
                    Some(entry) => {
                        let now = Instant::now();
                        entry.last_access = now;
                        entry.failed_at = Some(now);
                        CatalogMetrics::record_stale_served(&key.service_code, &key.region);
                        Ok(CatalogSnapshot {
                            index: Arc::clone(&entry.index),
                            stale: true,
                        })
                    }
                    None => Err(CatalogError::Fetch(err)),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Spawn the fetch+build task. Must be called with the state lock held so the
    /// task cannot install before its in-flight marker exists.
    fn start_build(&self, key: CacheKey) -> SharedBuild {
        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.state);
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let result = AssertUnwindSafe(fetch_and_build(fetcher.as_ref(), &task_key))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    warn!(key = %task_key, message = %message, "Catalog build panicked");
                    Err(CatalogError::BuildAborted {
                        service_code: task_key.service_code.clone(),
                        region: task_key.region.clone(),
                        message,
                    })
                });
            install(&state, &task_key, &result).await;
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(CatalogError::BuildAborted {
                    service_code: key.service_code,
                    region: key.region,
                    message: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

async fn fetch_and_build<F: PriceListFetcher + ?Sized>(
    fetcher: &F,
    key: &CacheKey,
) -> BuildResult {
    let document = match fetcher.fetch_price_list(&key.service_code, &key.region).await {
        Err(err) if err.is_retryable() => {
            warn!(key = %key, error = %err, "Price list fetch failed, retrying once");
            fetcher.fetch_price_list(&key.service_code, &key.region).await?
        }
        other => other?,
    };

    let started = Instant::now();
    let service_code = key.service_code.clone();
    let region = key.region.clone();
    let index = tokio::task::spawn_blocking(move || {
        CatalogIndex::build(&service_code, &region, document)
    })
    .await
    .map_err(|e| CatalogError::BuildAborted {
        service_code: key.service_code.clone(),
        region: key.region.clone(),
        message: e.to_string(),
    })??;

    CatalogMetrics::record_build(&key.service_code, &key.region, index.len(), started.elapsed());

    Ok(Arc::new(index))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "build task panicked".to_string())
}

/// Clear the in-flight marker and, on success, replace the entry for `key`.
async fn install(state: &Mutex<CacheState>, key: &CacheKey, result: &BuildResult) {
    let mut state = state.lock().await;
    state.in_flight.remove(key);

    let Ok(index) = result else {
        return;
    };

    let now = Instant::now();
    let entry = CacheEntry {
        index: Arc::clone(index),
        installed_at: now,
        last_access: now,
        failed_at: None,
    };

    if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
        if &evicted != key {
            info!(evicted = %evicted, installed = %key, "Evicted least recently used catalog");
            CatalogMetrics::record_eviction(&evicted.service_code, &evicted.region);
        }
    }
    CatalogMetrics::set_cache_entries(state.entries.len());
}
