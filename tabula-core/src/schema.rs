//! Resource schemas.
//!
//! A schema is an ordered column map. Callers describe only their domain
//! columns; [`build_schema`] wraps them with the identity and audit columns
//! every resource table carries.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entity::{AUDIT_COLUMNS, CREATED_COLUMN, ID_COLUMN, UPDATED_COLUMN};

/// SQL type descriptor for a column, e.g. `text not null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnType(String);

impl ColumnType {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    /// Auto-generated identity.
    pub fn identity() -> Self {
        Self::new("serial")
    }

    /// Creation timestamp defaulting to the insert time.
    pub fn created_timestamp() -> Self {
        Self::new("timestamptz not null default now()")
    }

    /// Nullable last-modified timestamp.
    pub fn updated_timestamp() -> Self {
        Self::new("timestamptz")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ColumnType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered mapping from column name to type descriptor.
///
/// Insertion order is preserved so generated DDL lists columns the way the
/// caller declared them. Inserting an existing name replaces its type in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn column(mut self, name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        self.insert(name, column_type);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, column_type: impl Into<ColumnType>) {
        let name = name.into();
        let column_type = column_type.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column_type = column_type,
            None => self.columns.push(Column { name, column_type }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.column_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns a client may write: everything except identity and audit.
    pub fn writable_fields(&self) -> Vec<String> {
        self.names()
            .filter(|name| *name != ID_COLUMN && !AUDIT_COLUMNS.contains(name))
            .map(str::to_string)
            .collect()
    }
}

impl<N, T> FromIterator<(N, T)> for Schema
where
    N: Into<String>,
    T: Into<ColumnType>,
{
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (name, column_type) in iter {
            schema.insert(name, column_type);
        }
        schema
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.name, &column.column_type)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to column type")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Schema, A::Error> {
                let mut schema = Schema::new();
                while let Some((name, column_type)) = access.next_entry::<String, ColumnType>()? {
                    schema.insert(name, column_type);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// Merge caller columns with the standard identity and audit columns.
///
/// Result order: `id`, caller columns, `created_dt`, `updated_dt`. A caller
/// `id` entry overrides the identity type; caller audit entries are replaced
/// by the standard ones.
pub fn build_schema(columns: &Schema) -> Schema {
    let mut schema = Schema::new().column(ID_COLUMN, ColumnType::identity());
    for column in columns.columns() {
        if AUDIT_COLUMNS.contains(&column.name.as_str()) {
            continue;
        }
        schema.insert(column.name.clone(), column.column_type.clone());
    }
    schema
        .column(CREATED_COLUMN, ColumnType::created_timestamp())
        .column(UPDATED_COLUMN, ColumnType::updated_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Schema {
        Schema::new()
            .column("name", "text not null")
            .column("price", "integer")
    }

    #[test]
    fn test_build_schema_adds_standard_columns() {
        let schema = build_schema(&items());
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["id", "name", "price", "created_dt", "updated_dt"]);
        assert_eq!(schema.get("id"), Some(&ColumnType::identity()));
        assert_eq!(schema.get("updated_dt"), Some(&ColumnType::updated_timestamp()));
    }

    #[test]
    fn test_build_schema_caller_id_overrides_identity() {
        let columns = Schema::new().column("id", "uuid default gen_random_uuid()");
        let schema = build_schema(&columns);
        assert_eq!(schema.len(), 3);
        assert_eq!(
            schema.get("id").map(ColumnType::as_str),
            Some("uuid default gen_random_uuid()")
        );
    }

    #[test]
    fn test_build_schema_replaces_caller_audit_columns() {
        let columns = Schema::new().column("created_dt", "text");
        let schema = build_schema(&columns);
        assert_eq!(schema.get("created_dt"), Some(&ColumnType::created_timestamp()));
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_writable_fields_exclude_identity_and_audit() {
        let schema = build_schema(&items());
        assert_eq!(schema.writable_fields(), vec!["name", "price"]);
    }

    #[test]
    fn test_schema_deserialize_preserves_order() -> Result<(), serde_json::Error> {
        let schema: Schema =
            serde_json::from_str(r#"{"zeta": "text", "alpha": "integer", "mid": "boolean"}"#)?;
        let names: Vec<&str> = schema.names().collect();
        // serde_json::Map sorts keys, but the visitor sees them in document order.
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        Ok(())
    }
}
