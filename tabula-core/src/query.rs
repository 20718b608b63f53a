//! Query assembly.
//!
//! Builders produce a typed [`Query`]; [`Query::to_statement`] renders it to
//! SQL text plus positional parameters. Table and column names are trusted,
//! caller-controlled identifiers and are interpolated. Values are only ever
//! bound through [`Params`] and never appear in the SQL text.
//!
//! Every builder is total: empty maps and field lists still render a
//! statement (`select *`, `default values`, no where clause).

use serde_json::{Map, Value};

use crate::entity::ID_COLUMN;
use crate::schema::Schema;

/// Column name to value, in key order.
pub type Columns = Map<String, Value>;

// ============================================================================
// STATEMENTS AND PARAMETERS
// ============================================================================

/// Rendered SQL plus the values for its `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Accumulates bound values and hands out their placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, returning its placeholder (`$1`, `$2`, ...).
    pub fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

// ============================================================================
// FRAGMENTS
// ============================================================================

/// Separator between `col = $n` fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// Conjunctive predicates (`a = $1 and b = $2`).
    And,
    /// Assignment lists (`a = $1, b = $2`).
    Comma,
}

impl Joiner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Joiner::And => " and ",
            Joiner::Comma => ", ",
        }
    }
}

/// Input accepted by [`build_bindings`].
///
/// Maps are predicates and default to [`Joiner::And`]; ordered lists are
/// assignments and default to [`Joiner::Comma`].
pub trait Bindings {
    fn default_joiner(&self) -> Joiner;
    fn entries(&self) -> Vec<(&str, &Value)>;
}

impl Bindings for Columns {
    fn default_joiner(&self) -> Joiner {
        Joiner::And
    }

    fn entries(&self) -> Vec<(&str, &Value)> {
        self.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

impl Bindings for [(String, Value)] {
    fn default_joiner(&self) -> Joiner {
        Joiner::Comma
    }

    fn entries(&self) -> Vec<(&str, &Value)> {
        self.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// `select <fields>`; no fields (or an empty list) selects `*`.
pub fn build_select(fields: Option<&[String]>) -> String {
    match fields {
        Some(fields) if !fields.is_empty() => format!("select {}", fields.join(", ")),
        _ => "select *".to_string(),
    }
}

/// `col = $n` fragments joined by `joiner` (or the input's default).
pub fn build_bindings<B: Bindings + ?Sized>(
    bindings: &B,
    joiner: Option<Joiner>,
    params: &mut Params,
) -> String {
    let joiner = joiner.unwrap_or_else(|| bindings.default_joiner());
    bindings
        .entries()
        .into_iter()
        .map(|(column, value)| format!("{} = {}", column, params.push(value.clone())))
        .collect::<Vec<_>>()
        .join(joiner.as_str())
}

/// `""` for no bindings, otherwise ` where <predicates>`.
pub fn build_where_clause(bindings: Option<&Columns>, params: &mut Params) -> String {
    match bindings {
        Some(bindings) if !bindings.is_empty() => {
            format!(" where {}", build_bindings(bindings, None, params))
        }
        _ => String::new(),
    }
}

// ============================================================================
// TYPED QUERIES
// ============================================================================

/// Server-side pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// A statement against one resource table.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select {
        table: String,
        fields: Option<Vec<String>>,
        filter: Columns,
        page: Option<Page>,
    },
    Count {
        table: String,
    },
    Insert {
        table: String,
        values: Columns,
    },
    Update {
        table: String,
        values: Columns,
        filter: Columns,
    },
    Delete {
        table: String,
        filter: Columns,
    },
}

impl Query {
    pub fn table(&self) -> &str {
        match self {
            Query::Select { table, .. }
            | Query::Count { table }
            | Query::Insert { table, .. }
            | Query::Update { table, .. }
            | Query::Delete { table, .. } => table,
        }
    }

    /// Render to SQL with positional placeholders.
    pub fn to_statement(&self) -> Statement {
        let mut params = Params::new();
        let sql = match self {
            Query::Select {
                table,
                fields,
                filter,
                page,
            } => {
                let mut sql = format!(
                    "{} from {}{}",
                    build_select(fields.as_deref()),
                    table,
                    build_where_clause(Some(filter), &mut params)
                );
                if let Some(page) = page {
                    let limit = params.push(Value::from(page.limit));
                    let offset = params.push(Value::from(page.offset));
                    sql.push_str(&format!(
                        " order by {} limit {} offset {}",
                        ID_COLUMN, limit, offset
                    ));
                }
                sql
            }
            Query::Count { table } => format!("select count(*) as total from {}", table),
            Query::Insert { table, values } => {
                if values.is_empty() {
                    format!("insert into {} default values returning {}", table, ID_COLUMN)
                } else {
                    let columns: Vec<&str> = values.keys().map(String::as_str).collect();
                    let placeholders: Vec<String> =
                        values.values().map(|v| params.push(v.clone())).collect();
                    format!(
                        "insert into {} ({}) values ({}) returning {}",
                        table,
                        columns.join(", "),
                        placeholders.join(", "),
                        ID_COLUMN
                    )
                }
            }
            Query::Update {
                table,
                values,
                filter,
            } => {
                let assignments: Vec<(String, Value)> =
                    values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let set = if assignments.is_empty() {
                    format!("{} = {}", ID_COLUMN, ID_COLUMN)
                } else {
                    build_bindings(assignments.as_slice(), None, &mut params)
                };
                format!(
                    "update {} set {}{}",
                    table,
                    set,
                    build_where_clause(Some(filter), &mut params)
                )
            }
            Query::Delete { table, filter } => format!(
                "delete from {}{}",
                table,
                build_where_clause(Some(filter), &mut params)
            ),
        };
        Statement {
            sql,
            params: params.into_values(),
        }
    }
}

fn id_filter(id: Value) -> Columns {
    let mut filter = Columns::new();
    filter.insert(ID_COLUMN.to_string(), id);
    filter
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn build_find_by(bindings: Option<&Columns>, table: &str, fields: Option<&[String]>) -> Query {
    Query::Select {
        table: table.to_string(),
        fields: fields.map(<[String]>::to_vec),
        filter: bindings.cloned().unwrap_or_default(),
        page: None,
    }
}

pub fn build_find_by_id(id: Value, table: &str, fields: Option<&[String]>) -> Query {
    build_find_by(Some(&id_filter(id)), table, fields)
}

/// One page of rows ordered by identity.
pub fn build_find_page(table: &str, fields: Option<&[String]>, limit: u64, offset: u64) -> Query {
    Query::Select {
        table: table.to_string(),
        fields: fields.map(<[String]>::to_vec),
        filter: Columns::new(),
        page: Some(Page { limit, offset }),
    }
}

pub fn build_count(table: &str) -> Query {
    Query::Count {
        table: table.to_string(),
    }
}

/// Insert returning the generated identity.
pub fn build_insert(table: &str, values: &Columns) -> Query {
    Query::Insert {
        table: table.to_string(),
        values: values.clone(),
    }
}

pub fn build_update_by(values: &Columns, table: &str, bindings: &Columns) -> Query {
    Query::Update {
        table: table.to_string(),
        values: values.clone(),
        filter: bindings.clone(),
    }
}

pub fn build_update_by_id(id: Value, values: &Columns, table: &str) -> Query {
    build_update_by(values, table, &id_filter(id))
}

pub fn build_delete_by(table: &str, bindings: Option<&Columns>) -> Query {
    Query::Delete {
        table: table.to_string(),
        filter: bindings.cloned().unwrap_or_default(),
    }
}

pub fn build_delete_by_id(id: Value, table: &str) -> Query {
    build_delete_by(table, Some(&id_filter(id)))
}

/// Table DDL. The primary key on `id` always comes first among constraints.
pub fn build_create_table(name: &str, schema: &Schema, constraints: &[String]) -> String {
    create_table(false, name, schema, constraints)
}

/// Same as [`build_create_table`] but a no-op when the table exists.
pub fn build_create_table_if_absent(name: &str, schema: &Schema, constraints: &[String]) -> String {
    create_table(true, name, schema, constraints)
}

fn create_table(if_absent: bool, name: &str, schema: &Schema, constraints: &[String]) -> String {
    let mut parts: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("{} {}", c.name, c.column_type))
        .collect();
    parts.push(format!("primary key ({})", ID_COLUMN));
    parts.extend(constraints.iter().cloned());

    format!(
        "create table {}{} ({})",
        if if_absent { "if not exists " } else { "" },
        name,
        parts.join(", ")
    )
}
