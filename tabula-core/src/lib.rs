//! Tabula Core - Resource Schemas, Query Assembly and the Database Seam
//!
//! Pure building blocks shared by the API and storage crates:
//! - [`schema`]: column maps merged with the standard identity/audit columns
//! - [`query`]: a typed query value rendered into parameterized SQL
//! - [`database`]: the async trait every database collaborator implements
//!
//! Nothing in this crate performs I/O.

pub mod database;
pub mod entity;
pub mod error;
pub mod query;
pub mod schema;

pub use database::Database;
pub use entity::{
    id_value, value_to_string, Entity, AUDIT_COLUMNS, CREATED_COLUMN, ID_COLUMN, UPDATED_COLUMN,
};
pub use error::{DbError, DbResult};
pub use query::{
    build_bindings, build_count, build_create_table, build_create_table_if_absent, build_delete_by,
    build_delete_by_id, build_find_by, build_find_by_id, build_find_page, build_insert,
    build_select, build_update_by, build_update_by_id, build_where_clause, Columns, Joiner, Params,
    Query, Statement,
};
pub use schema::{build_schema, Column, ColumnType, Schema};
