//! The route tag cache.
//!
//! [`TagCache`] is constructed once at startup and shared by handle with
//! every handler. All tag and count operations are synchronous and total.
//! Write handlers additionally serialize on [`TagCache::lock_route`] so that
//! check, write and cache update for one route cannot interleave within
//! this process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tabula_core::Entity;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::{InMemoryTagStore, TagStore};
use crate::tag::{compute_tag, EntityTag};

type RouteLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Statistics about tag lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a tag.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Routes currently tagged.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Route → tag and table → count cache.
pub struct TagCache {
    store: Arc<dyn TagStore>,
    locks: RouteLocks,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TagCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TagCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl TagCache {
    /// Cache over a fresh process-local store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryTagStore::new()))
    }

    /// Cache over a caller-supplied backend.
    pub fn with_store(store: Arc<dyn TagStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // TAGS
    // ========================================================================

    /// Compute and store the tag for `entity` under `route`.
    pub fn record_tag(&self, route: &str, entity: &Entity) -> EntityTag {
        let tag = compute_tag(entity);
        tracing::trace!(route, tag = %tag, "Recorded entity tag");
        self.store.put_tag(route, tag.clone());
        tag
    }

    /// Replace the tag for `route`. Same as [`TagCache::record_tag`].
    pub fn update_tag(&self, route: &str, entity: &Entity) -> EntityTag {
        self.record_tag(route, entity)
    }

    pub fn clear_tag(&self, route: &str) {
        tracing::trace!(route, "Cleared entity tag");
        self.store.remove_tag(route);
    }

    /// Current tag for `route`, if one has been observed.
    pub fn tag(&self, route: &str) -> Option<EntityTag> {
        let tag = self.store.get_tag(route);
        if tag.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        tag
    }

    // ========================================================================
    // COUNTS
    // ========================================================================

    pub fn set_count(&self, table: &str, count: u64) {
        self.store.put_count(table, count);
    }

    /// Cached row count; `None` means unknown.
    pub fn count(&self, table: &str) -> Option<u64> {
        self.store.get_count(table)
    }

    /// Forget the row count so the next list recomputes it.
    pub fn invalidate_count(&self, table: &str) {
        self.store.remove_count(table);
    }

    // ========================================================================
    // ROUTE LOCKS
    // ========================================================================

    /// Acquire the write lock for `route`.
    pub async fn lock_route(&self, route: &str) -> RouteGuard {
        let mutex = self
            .locks
            .entry(route.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        RouteGuard {
            route: route.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Number of routes with a live lock entry.
    pub fn locked_routes(&self) -> usize {
        self.locks.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.store.tag_len() as u64,
        }
    }
}

/// Held for the duration of a write to one route.
///
/// Dropping it releases the lock and removes the route's entry when no other
/// request is waiting on it.
pub struct RouteGuard {
    route: String,
    locks: RouteLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RouteGuard {
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        // Release first so the strong count reflects only the map and waiters.
        self.guard.take();
        self.locks
            .remove_if(&self.route, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
