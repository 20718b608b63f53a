//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use tabula_core::Database;
use tabula_storage::TagCache;

use crate::config::ApiConfig;

/// Handle to the database collaborator shared by every router.
pub type SharedDatabase = Arc<dyn Database>;

/// Application-wide state shared across all routes.
///
/// The tag cache is constructed once here and shared by handle; no handler
/// reaches for a global.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    pub cache: Arc<TagCache>,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: SharedDatabase, config: ApiConfig) -> Self {
        Self::with_cache(db, Arc::new(TagCache::new()), config)
    }

    /// State over a caller-supplied cache (e.g. one backed by a shared store).
    pub fn with_cache(db: SharedDatabase, cache: Arc<TagCache>, config: ApiConfig) -> Self {
        Self {
            db,
            cache,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(SharedDatabase, db);
crate::impl_from_ref!(Arc<TagCache>, cache);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Instant, start_time);
