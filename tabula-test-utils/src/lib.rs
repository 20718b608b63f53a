//! Tabula Test Utilities
//!
//! Shared test infrastructure for the Tabula workspace:
//! - [`MemoryDatabase`], an in-memory `Database` double with call counters
//!   and failure injection
//! - Proptest generators for entities and column maps
//! - Fixtures for the `items` resource used throughout the protocol tests

mod memory;

pub use memory::MemoryDatabase;

// Re-export core types for convenience
pub use tabula_core::{
    build_schema, Columns, ColumnType, Database, DbError, DbResult, Entity, Query, Schema,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Tabula values.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Generate a lowercase SQL-safe column name.
    pub fn arb_column_name() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{0,11}".prop_filter("reserved column", |name| {
            !matches!(name.as_str(), "id" | "created_dt" | "updated_dt")
        })
    }

    /// Generate a scalar JSON value.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,32}".prop_map(Value::from),
        ]
    }

    /// Generate a column map of domain fields.
    pub fn arb_columns() -> impl Strategy<Value = Columns> {
        prop::collection::btree_map(arb_column_name(), arb_scalar(), 0..8)
            .prop_map(|m| m.into_iter().collect())
    }

    /// Generate an `items` create body: non-empty name, optional price.
    pub fn arb_item_body() -> impl Strategy<Value = Entity> {
        ("[A-Za-z][A-Za-z0-9 ]{0,23}", prop::option::of(0i64..100_000)).prop_map(
            |(name, price)| {
                let mut body = Entity::new();
                body.insert("name".to_string(), Value::from(name));
                if let Some(price) = price {
                    body.insert("price".to_string(), Value::from(price));
                }
                body
            },
        )
    }

    /// Generate a caller schema of domain columns.
    pub fn arb_schema() -> impl Strategy<Value = Schema> {
        prop::collection::vec(
            (arb_column_name(), "(text|integer|boolean|jsonb|text not null)"),
            0..8,
        )
        .prop_map(|pairs| pairs.into_iter().collect())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for the `items` resource.

    use super::*;
    use serde_json::Value;

    pub const ITEMS: &str = "items";

    /// Domain columns of the `items` resource.
    pub fn items_columns() -> Schema {
        Schema::new()
            .column("name", "text not null")
            .column("price", "integer")
    }

    /// Full `items` schema, standard columns included.
    pub fn items_schema() -> Schema {
        build_schema(&items_columns())
    }

    /// An `items` body with the given name and price.
    pub fn item(name: &str, price: i64) -> Entity {
        let mut body = Entity::new();
        body.insert("name".to_string(), Value::from(name));
        body.insert("price".to_string(), Value::from(price));
        body
    }

    /// A database holding `count` items with ids `1..=count`.
    pub fn seeded_items(count: usize) -> MemoryDatabase {
        let db = MemoryDatabase::new();
        db.create_table(ITEMS);
        for i in 1..=count {
            // A fresh table never rejects a serial insert.
            let _ = db.seed(ITEMS, item(&format!("item-{i}"), i as i64 * 100));
        }
        db
    }
}
