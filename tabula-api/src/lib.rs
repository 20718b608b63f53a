//! Tabula API - Conditional CRUD over HTTP
//!
//! Exposes PostgreSQL tables as REST resources with optimistic concurrency:
//! every read hands out an entity tag, and updates or deletes must present
//! the current one in `If-Match`. Tags and row counts live in a shared
//! [`TagCache`](tabula_storage::TagCache) owned by the router state.
//!
//! Handlers talk to the database through [`tabula_core::Database`];
//! [`DbClient`] is the Postgres implementation.

pub mod conditional;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod macros;
pub mod manifest;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use manifest::{provision, ManifestError, ResourceDefinition, ResourceManifest};
pub use routes::{
    create_api_router, crud_router, Methods, ResourceOptions, ResourceState, Validator,
};
pub use state::{AppState, SharedDatabase};
