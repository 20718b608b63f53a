//! In-memory [`Database`] double.
//!
//! Evaluates typed [`Query`] values directly against per-table row maps, the
//! way a Postgres table with a `serial` id would respond. Tables must exist
//! before use: either [`MemoryDatabase::create_table`] or a `create table`
//! statement through [`Database::execute_ddl`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tabula_core::{
    Columns, Database, DbError, DbResult, Entity, Query, CREATED_COLUMN, ID_COLUMN, UPDATED_COLUMN,
};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Entity>,
}

impl Table {
    fn matching(&self, filter: &Columns) -> impl Iterator<Item = (&i64, &Entity)> {
        let filter = filter.clone();
        self.rows.iter().filter(move |(_, row)| {
            filter
                .iter()
                .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
        })
    }

    fn matching_ids(&self, filter: &Columns) -> Vec<i64> {
        self.matching(filter).map(|(id, _)| *id).collect()
    }
}

/// Shared in-memory database. Clones share the same tables and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    log: Arc<Mutex<Vec<Query>>>,
    ddl: Arc<Mutex<Vec<String>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    fail_next: Arc<Mutex<Option<DbError>>>,
    affected_next: Arc<Mutex<Option<u64>>>,
    omit_insert_id: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
}

fn poisoned() -> DbError {
    DbError::Unavailable {
        reason: "memory database lock poisoned".to_string(),
    }
}

fn missing_table(table: &str) -> DbError {
    DbError::QueryFailed {
        reason: format!("relation \"{}\" does not exist", table),
    }
}

fn row_id(value: &Value) -> DbResult<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| DbError::Bind {
        index: 1,
        reason: format!("invalid input syntax for type integer: {}", value),
    })
}

fn now() -> Value {
    Value::from(chrono::Utc::now().to_rfc3339())
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table; a no-op when it exists.
    pub fn create_table(&self, name: &str) {
        if let Ok(mut tables) = self.tables.write() {
            tables.entry(name.to_string()).or_default();
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables
            .read()
            .map(|tables| tables.contains_key(name))
            .unwrap_or(false)
    }

    /// Insert a row directly, bypassing counters. Returns its id.
    pub fn seed(&self, table: &str, values: Entity) -> DbResult<i64> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table_rows = tables.entry(table.to_string()).or_default();
        insert_row(table_rows, values)
    }

    /// Read a row directly, bypassing counters.
    pub fn row(&self, table: &str, id: i64) -> Option<Entity> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).and_then(|t| t.rows.get(&id).cloned()))
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    /// Number of select/count queries served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of insert/update/delete queries served.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every query received, in order.
    pub fn queries(&self) -> Vec<Query> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// DDL statements received, in order.
    pub fn ddl_statements(&self) -> Vec<String> {
        self.ddl.lock().map(|ddl| ddl.clone()).unwrap_or_default()
    }

    /// Make the next query fail with `error`.
    pub fn fail_next(&self, error: DbError) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(error);
        }
    }

    /// Make the next update or delete report `rows` affected without
    /// touching any row.
    pub fn report_next_affected(&self, rows: u64) {
        if let Ok(mut slot) = self.affected_next.lock() {
            *slot = Some(rows);
        }
    }

    /// Make the next insert store its row but return one without an id.
    pub fn omit_next_insert_id(&self) {
        self.omit_insert_id.store(true, Ordering::SeqCst);
    }

    /// Toggle connectivity; while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> DbResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable {
                reason: "connection refused".to_string(),
            });
        }
        let injected = self.fail_next.lock().map_err(|_| poisoned())?.take();
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn record(&self, query: &Query) {
        if let Ok(mut log) = self.log.lock() {
            log.push(query.clone());
        }
        let counter = match query {
            Query::Select { .. } | Query::Count { .. } => &self.reads,
            _ => &self.writes,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Evaluate a query, returning its rows and affected-row count.
    fn run(&self, query: &Query) -> DbResult<(Vec<Entity>, u64)> {
        self.check()?;
        self.record(query);

        if matches!(query, Query::Update { .. } | Query::Delete { .. }) {
            let forced = self.affected_next.lock().map_err(|_| poisoned())?.take();
            if let Some(rows) = forced {
                return Ok((Vec::new(), rows));
            }
        }

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables
            .get_mut(query.table())
            .ok_or_else(|| missing_table(query.table()))?;

        match query {
            Query::Select {
                fields,
                filter,
                page,
                ..
            } => {
                let rows = table.matching(filter).map(|(_, row)| row);
                let rows: Vec<&Entity> = match page {
                    Some(page) => rows
                        .skip(page.offset as usize)
                        .take(page.limit as usize)
                        .collect(),
                    None => rows.collect(),
                };
                let projected: Vec<Entity> = rows
                    .into_iter()
                    .map(|row| project(row, fields.as_deref()))
                    .collect();
                let n = projected.len() as u64;
                Ok((projected, n))
            }
            Query::Count { .. } => {
                let mut row = Entity::new();
                row.insert("total".to_string(), Value::from(table.rows.len() as u64));
                Ok((vec![row], 1))
            }
            Query::Insert { values, .. } => {
                let id = insert_row(table, values.clone())?;
                let mut row = Entity::new();
                if !self.omit_insert_id.swap(false, Ordering::SeqCst) {
                    row.insert(ID_COLUMN.to_string(), Value::from(id));
                }
                Ok((vec![row], 1))
            }
            Query::Update { values, filter, .. } => {
                let ids = table.matching_ids(filter);
                for id in &ids {
                    if let Some(row) = table.rows.get_mut(id) {
                        for (column, value) in values {
                            if column != ID_COLUMN {
                                row.insert(column.clone(), value.clone());
                            }
                        }
                    }
                }
                Ok((Vec::new(), ids.len() as u64))
            }
            Query::Delete { filter, .. } => {
                let ids = table.matching_ids(filter);
                for id in &ids {
                    table.rows.remove(id);
                }
                Ok((Vec::new(), ids.len() as u64))
            }
        }
    }
}

fn insert_row(table: &mut Table, mut values: Entity) -> DbResult<i64> {
    let id = match values.get(ID_COLUMN) {
        Some(value) => row_id(value)?,
        None => {
            table.next_id += 1;
            table.next_id
        }
    };
    if table.rows.contains_key(&id) {
        return Err(DbError::QueryFailed {
            reason: format!("duplicate key value violates unique constraint: id={}", id),
        });
    }
    table.next_id = table.next_id.max(id);

    values.insert(ID_COLUMN.to_string(), Value::from(id));
    values.entry(CREATED_COLUMN.to_string()).or_insert_with(now);
    values.entry(UPDATED_COLUMN.to_string()).or_insert(Value::Null);
    table.rows.insert(id, values);
    Ok(id)
}

fn project(row: &Entity, fields: Option<&[String]>) -> Entity {
    match fields {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
            .collect(),
        _ => row.clone(),
    }
}

/// Table name from `create table [if not exists] <name> (...)`.
fn created_table_name(ddl: &str) -> Option<&str> {
    let rest = ddl.trim_start().strip_prefix("create table ")?;
    let rest = rest.strip_prefix("if not exists ").unwrap_or(rest);
    rest.split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn one_or_none(&self, query: &Query) -> DbResult<Option<Entity>> {
        let (mut rows, _) = self.run(query)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            got => Err(DbError::UnexpectedRowCount { got }),
        }
    }

    async fn many(&self, query: &Query) -> DbResult<Vec<Entity>> {
        self.run(query).map(|(rows, _)| rows)
    }

    async fn execute(&self, query: &Query) -> DbResult<u64> {
        self.run(query).map(|(_, affected)| affected)
    }

    async fn execute_ddl(&self, ddl: &str) -> DbResult<()> {
        self.check()?;
        if let Ok(mut log) = self.ddl.lock() {
            log.push(ddl.to_string());
        }
        if let Some(name) = created_table_name(ddl) {
            let mut tables = self.tables.write().map_err(|_| poisoned())?;
            let exists = tables.contains_key(name);
            if exists && !ddl.contains("if not exists") {
                return Err(DbError::QueryFailed {
                    reason: format!("relation \"{}\" already exists", name),
                });
            }
            tables.entry(name.to_string()).or_default();
        }
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        self.check()
    }
}
