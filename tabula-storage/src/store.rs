//! Tag store backends.
//!
//! [`TagStore`] is the seam for swapping the process-local maps for a shared
//! external cache. Implementations must be safe for concurrent use and must
//! never fail: a backend that cannot answer reports "absent".

use dashmap::DashMap;

use crate::tag::EntityTag;

/// Key-value backend for route tags and table counts.
pub trait TagStore: Send + Sync {
    fn get_tag(&self, route: &str) -> Option<EntityTag>;
    fn put_tag(&self, route: &str, tag: EntityTag);
    fn remove_tag(&self, route: &str);

    fn get_count(&self, table: &str) -> Option<u64>;
    fn put_count(&self, table: &str, count: u64);
    fn remove_count(&self, table: &str);

    /// Number of routes currently tagged.
    fn tag_len(&self) -> usize;
}

/// Process-local store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    tags: DashMap<String, EntityTag>,
    counts: DashMap<String, u64>,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TagStore for InMemoryTagStore {
    fn get_tag(&self, route: &str) -> Option<EntityTag> {
        self.tags.get(route).map(|entry| entry.value().clone())
    }

    fn put_tag(&self, route: &str, tag: EntityTag) {
        self.tags.insert(route.to_string(), tag);
    }

    fn remove_tag(&self, route: &str) {
        self.tags.remove(route);
    }

    fn get_count(&self, table: &str) -> Option<u64> {
        self.counts.get(table).map(|entry| *entry.value())
    }

    fn put_count(&self, table: &str, count: u64) {
        self.counts.insert(table.to_string(), count);
    }

    fn remove_count(&self, table: &str) {
        self.counts.remove(table);
    }

    fn tag_len(&self) -> usize {
        self.tags.len()
    }
}
