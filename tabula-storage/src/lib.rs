//! Tabula Storage - Entity Tags and the Route Tag Cache
//!
//! The cache is a consistency aid, never a source of truth: the database
//! always owns entity content. Two independent mappings live here:
//! - route (`/items/1`) to the entity tag last observed for it
//! - table (`items`) to its row count
//!
//! Tags are computed only inside this crate; handlers record entities and
//! read tags back, they never hash anything themselves.

pub mod cache;
pub mod store;
pub mod tag;

pub use cache::{CacheStats, RouteGuard, TagCache};
pub use store::{InMemoryTagStore, TagStore};
pub use tag::{compute_tag, EntityTag};
