//! Entity representation and the standard column names.

use serde_json::{Map, Value};

/// A row of a resource table: column name to JSON value.
pub type Entity = Map<String, Value>;

/// Identity column present on every resource table.
pub const ID_COLUMN: &str = "id";

/// Creation timestamp, set once by the database.
pub const CREATED_COLUMN: &str = "created_dt";

/// Last-modified timestamp, set on every update.
pub const UPDATED_COLUMN: &str = "updated_dt";

/// Columns managed automatically and excluded from domain comparisons.
pub const AUDIT_COLUMNS: [&str; 2] = [CREATED_COLUMN, UPDATED_COLUMN];

/// Convert a raw identifier (path segment) into the value bound for it.
///
/// Integers become JSON numbers so they compare equal to serial ids;
/// everything else (uuids, slugs) stays a string.
pub fn id_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Render a scalar JSON value the way it appears in a URL or header.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
