//! Custom request extractors.

mod resource_path;

pub use resource_path::{EntityId, RoutePath};
