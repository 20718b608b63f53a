//! Route assembly for one resource.
//!
//! `crud_router` binds the enabled CRUD handlers at `/` (collection) and
//! `/:id` (instance). Mount the result with `Router::nest("/<name>", ...)`.
//!
//! # Usage
//!
//! ```ignore
//! let items = crud_router(
//!     "items",
//!     &Schema::new().column("name", "text not null"),
//!     ResourceOptions::default().methods(Methods::GET | Methods::POST),
//!     &state,
//! );
//! let app = Router::new().nest("/items", items);
//! ```

use std::fmt;
use std::sync::Arc;

use axum::{routing::MethodRouter, Router};
use bitflags::bitflags;
use tabula_core::{build_schema, id_value, value_to_string, Entity, Schema};

use super::crud;
use crate::state::AppState;

bitflags! {
    /// HTTP methods a resource exposes. `GET` covers both list and read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Methods: u8 {
        const GET = 1 << 0;
        const POST = 1 << 1;
        const PUT = 1 << 2;
        const DELETE = 1 << 3;
    }
}

impl Default for Methods {
    fn default() -> Self {
        Methods::all()
    }
}

impl Methods {
    /// Parse method names such as `["get", "PUT"]`; unknown names are `Err`.
    pub fn from_names<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Methods::empty(), |acc, name| {
            let name = name.as_ref().trim().to_ascii_uppercase();
            Methods::from_name(&name)
                .map(|m| acc | m)
                .ok_or_else(|| format!("unknown HTTP method '{}'", name))
        })
    }
}

/// Body predicate run before create/update; `false` rejects with 400.
pub type Validator = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Per-resource behavior.
#[derive(Clone, Default)]
pub struct ResourceOptions {
    pub methods: Methods,
    /// Columns clients may write. Defaults to the schema minus id/audit columns.
    pub schema_fields: Option<Vec<String>>,
    pub create_validator: Option<Validator>,
    pub update_validator: Option<Validator>,
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("methods", &self.methods)
            .field("schema_fields", &self.schema_fields)
            .field("create_validator", &self.create_validator.is_some())
            .field("update_validator", &self.update_validator.is_some())
            .finish()
    }
}

impl ResourceOptions {
    pub fn methods(mut self, methods: Methods) -> Self {
        self.methods = methods;
        self
    }

    pub fn schema_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn create_validator(
        mut self,
        validator: impl Fn(&Entity) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.create_validator = Some(Arc::new(validator));
        self
    }

    pub fn update_validator(
        mut self,
        validator: impl Fn(&Entity) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.update_validator = Some(Arc::new(validator));
        self
    }
}

/// Everything a handler needs for one resource.
pub struct ResourceState {
    pub table: String,
    pub schema: Schema,
    pub write_fields: Vec<String>,
    pub options: ResourceOptions,
    pub app: AppState,
}

impl ResourceState {
    pub fn new(table: &str, columns: &Schema, options: ResourceOptions, app: AppState) -> Self {
        let schema = build_schema(columns);
        let write_fields = options
            .schema_fields
            .clone()
            .unwrap_or_else(|| schema.writable_fields());
        Self {
            table: table.to_string(),
            schema,
            write_fields,
            options,
            app,
        }
    }

    /// Cache and lock key for one row: `/<table>/<id>` with the id in the
    /// form it is bound as, so `/items/01` and `/items/1` share a key.
    pub fn row_key(&self, id: &str) -> String {
        format!("/{}/{}", self.table, value_to_string(&id_value(id)))
    }
}

/// Router exposing the enabled CRUD operations for `table`.
pub fn crud_router(table: &str, columns: &Schema, options: ResourceOptions, app: &AppState) -> Router {
    let methods = options.methods;
    let state = Arc::new(ResourceState::new(table, columns, options, app.clone()));

    let mut collection: MethodRouter<Arc<ResourceState>> = MethodRouter::new();
    let mut instance: MethodRouter<Arc<ResourceState>> = MethodRouter::new();

    if methods.contains(Methods::GET) {
        collection = collection.get(crud::retrieve_all);
        instance = instance.get(crud::retrieve);
    }
    if methods.contains(Methods::POST) {
        collection = collection.post(crud::create);
    }
    if methods.contains(Methods::PUT) {
        instance = instance.put(crud::update);
    }
    if methods.contains(Methods::DELETE) {
        instance = instance.delete(crud::remove);
    }

    let mut router = Router::new();
    if methods.intersects(Methods::GET | Methods::POST) {
        router = router.route("/", collection);
    }
    if methods.intersects(Methods::GET | Methods::PUT | Methods::DELETE) {
        router = router.route("/:id", instance);
    }

    tracing::info!(table, methods = ?methods, "Mounted resource routes");
    router.with_state(state)
}
