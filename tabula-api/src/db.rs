//! Database Connection Pool Module
//!
//! This module provides PostgreSQL connection pooling using deadpool-postgres
//! and the [`Database`] implementation handlers run against.
//!
//! Queries arrive as typed [`Query`] values and are rendered to parameterized
//! SQL. JSON values are bound by the parameter type the server inferred for
//! each placeholder, and result columns are decoded back into JSON by column
//! type, so handlers never see driver types.
//!
//! `numeric` travels as a JSON number (or a string when it does not fit one),
//! `bytea` as a `\x`-prefixed hex string, `inet` as its address text, and
//! one-dimensional arrays of the scalar types as JSON arrays. Columns of any
//! other type are returned as their raw value: text when it is UTF-8, hex
//! otherwise.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::error::Error;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use tabula_core::{value_to_string, Database, DbError, DbResult, Entity, Query};
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::constants::{DEFAULT_DB_POOL_SIZE, DEFAULT_DB_TIMEOUT_SECS};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "tabula".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: DEFAULT_DB_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("TABULA_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TABULA_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("TABULA_DB_NAME").unwrap_or_else(|_| "tabula".to_string()),
            user: std::env::var("TABULA_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("TABULA_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("TABULA_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_POOL_SIZE),
            timeout: Duration::from_secs(
                std::env::var("TABULA_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        pool_config.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

type BoundParam = Box<dyn ToSql + Sync + Send>;

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> DbResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Prepare, bind and run a row-returning query.
    async fn query_rows(&self, query: &Query) -> DbResult<Vec<Row>> {
        let statement = query.to_statement();
        tracing::trace!(sql = %statement.sql, params = statement.params.len(), "Executing query");

        let conn = self.get_conn().await?;
        let prepared = conn
            .prepare_cached(&statement.sql)
            .await
            .map_err(query_failed)?;
        let bound = bind_params(prepared.params(), &statement.params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        conn.query(&prepared, &refs).await.map_err(query_failed)
    }

    async fn execute_query(&self, query: &Query) -> DbResult<u64> {
        let statement = query.to_statement();
        tracing::trace!(sql = %statement.sql, params = statement.params.len(), "Executing statement");

        let conn = self.get_conn().await?;
        let prepared = conn
            .prepare_cached(&statement.sql)
            .await
            .map_err(query_failed)?;
        let bound = bind_params(prepared.params(), &statement.params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        conn.execute(&prepared, &refs).await.map_err(query_failed)
    }
}

#[async_trait]
impl Database for DbClient {
    async fn one_or_none(&self, query: &Query) -> DbResult<Option<Entity>> {
        let rows = self.query_rows(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => rows.first().map(decode_row).transpose(),
            got => Err(DbError::UnexpectedRowCount { got }),
        }
    }

    async fn many(&self, query: &Query) -> DbResult<Vec<Entity>> {
        let rows = self.query_rows(query).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, query: &Query) -> DbResult<u64> {
        self.execute_query(query).await
    }

    async fn execute_ddl(&self, ddl: &str) -> DbResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(ddl).await.map_err(query_failed)
    }

    async fn ping(&self) -> DbResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute("select 1").await.map_err(query_failed)
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: PoolError) -> DbError {
    tracing::error!("Connection pool error: {:?}", err);
    match err {
        PoolError::Timeout(_) => DbError::PoolExhausted,
        other => DbError::Unavailable {
            reason: other.to_string(),
        },
    }
}

fn query_failed(err: tokio_postgres::Error) -> DbError {
    tracing::error!("Database error: {:?}", err);
    DbError::QueryFailed {
        reason: err.to_string(),
    }
}

// ============================================================================
// VALUE BINDING
// ============================================================================

/// Box every JSON value as the Rust type its placeholder was inferred as.
fn bind_params(types: &[Type], values: &[Value]) -> DbResult<Vec<BoundParam>> {
    if types.len() != values.len() {
        return Err(DbError::Bind {
            index: types.len().min(values.len()) + 1,
            reason: format!(
                "statement expects {} parameters, got {}",
                types.len(),
                values.len()
            ),
        });
    }
    types
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (ty, value))| bind_value(i + 1, ty, value))
        .collect()
}

fn bind_error(index: usize, ty: &Type, value: &Value) -> DbError {
    DbError::Bind {
        index,
        reason: format!("cannot convert {} to {}", value, ty),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "t" => Some(true),
            "false" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// `\x`-prefixed hex, the form `bytea` columns decode to.
fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    let hex_digits = value.as_str()?.strip_prefix("\\x")?;
    hex::decode(hex_digits).ok()
}

/// JSON array to a one-dimensional SQL array; `null` elements stay NULL.
fn as_array<T>(value: &Value, element: impl Fn(&Value) -> Option<T>) -> Option<Vec<Option<T>>> {
    value
        .as_array()?
        .iter()
        .map(|v| if v.is_null() { Some(None) } else { element(v).map(Some) })
        .collect()
}

fn bind_value(index: usize, ty: &Type, value: &Value) -> DbResult<BoundParam> {
    let err = || bind_error(index, ty, value);

    // SQL NULL keeps the placeholder's type.
    if value.is_null() {
        let null: BoundParam = match *ty {
            Type::BOOL => Box::new(None::<bool>),
            Type::INT2 => Box::new(None::<i16>),
            Type::INT4 => Box::new(None::<i32>),
            Type::INT8 => Box::new(None::<i64>),
            Type::FLOAT4 => Box::new(None::<f32>),
            Type::FLOAT8 => Box::new(None::<f64>),
            Type::JSON | Type::JSONB => Box::new(None::<Value>),
            Type::TIMESTAMPTZ => Box::new(None::<DateTime<Utc>>),
            Type::TIMESTAMP => Box::new(None::<NaiveDateTime>),
            Type::DATE => Box::new(None::<NaiveDate>),
            Type::UUID => Box::new(None::<Uuid>),
            Type::NUMERIC => Box::new(None::<Decimal>),
            Type::BYTEA => Box::new(None::<Vec<u8>>),
            Type::INET => Box::new(None::<IpAddr>),
            Type::BOOL_ARRAY => Box::new(None::<Vec<Option<bool>>>),
            Type::INT4_ARRAY => Box::new(None::<Vec<Option<i32>>>),
            Type::INT8_ARRAY => Box::new(None::<Vec<Option<i64>>>),
            Type::FLOAT8_ARRAY => Box::new(None::<Vec<Option<f64>>>),
            Type::NUMERIC_ARRAY => Box::new(None::<Vec<Option<Decimal>>>),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => Box::new(None::<Vec<Option<String>>>),
            _ => Box::new(None::<String>),
        };
        return Ok(null);
    }

    let bound: BoundParam = match *ty {
        Type::BOOL => Box::new(as_bool(value).ok_or_else(err)?),
        Type::INT2 => {
            let n = as_i64(value).ok_or_else(err)?;
            Box::new(i16::try_from(n).map_err(|_| err())?)
        }
        Type::INT4 => {
            let n = as_i64(value).ok_or_else(err)?;
            Box::new(i32::try_from(n).map_err(|_| err())?)
        }
        Type::INT8 => Box::new(as_i64(value).ok_or_else(err)?),
        Type::FLOAT4 => Box::new(as_f64(value).ok_or_else(err)? as f32),
        Type::FLOAT8 => Box::new(as_f64(value).ok_or_else(err)?),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            Box::new(value_to_string(value))
        }
        Type::JSON | Type::JSONB => Box::new(value.clone()),
        Type::TIMESTAMPTZ => {
            let s = value.as_str().ok_or_else(err)?;
            let ts = DateTime::parse_from_rfc3339(s).map_err(|_| err())?;
            Box::new(ts.with_timezone(&Utc))
        }
        Type::TIMESTAMP => {
            let s = value.as_str().ok_or_else(err)?;
            let ts = DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.naive_utc())
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|_| err())?;
            Box::new(ts)
        }
        Type::DATE => {
            let s = value.as_str().ok_or_else(err)?;
            Box::new(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| err())?)
        }
        Type::UUID => {
            let s = value.as_str().ok_or_else(err)?;
            Box::new(Uuid::parse_str(s).map_err(|_| err())?)
        }
        Type::NUMERIC => Box::new(as_decimal(value).ok_or_else(err)?),
        Type::BYTEA => Box::new(as_bytes(value).ok_or_else(err)?),
        Type::INET => {
            let s = value.as_str().ok_or_else(err)?;
            Box::new(s.trim().parse::<IpAddr>().map_err(|_| err())?)
        }
        Type::BOOL_ARRAY => Box::new(as_array(value, as_bool).ok_or_else(err)?),
        Type::INT4_ARRAY => Box::new(
            as_array(value, |v| as_i64(v).and_then(|n| i32::try_from(n).ok())).ok_or_else(err)?,
        ),
        Type::INT8_ARRAY => Box::new(as_array(value, as_i64).ok_or_else(err)?),
        Type::FLOAT8_ARRAY => Box::new(as_array(value, as_f64).ok_or_else(err)?),
        Type::NUMERIC_ARRAY => Box::new(as_array(value, as_decimal).ok_or_else(err)?),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => Box::new(
            as_array(value, |v| Some(value_to_string(v))).ok_or_else(err)?,
        ),
        _ => {
            return Err(DbError::Bind {
                index,
                reason: format!("unsupported parameter type {}", ty),
            })
        }
    };
    Ok(bound)
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn decode_error(column: &str, err: tokio_postgres::Error) -> DbError {
    DbError::Decode {
        column: column.to_string(),
        reason: err.to_string(),
    }
}

fn decimal_to_json(d: Decimal) -> Value {
    let text = d.normalize().to_string();
    match Number::from_str(&text) {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    Value::String(format!("\\x{}", hex::encode(bytes)))
}

fn array_to_json<T>(items: Vec<Option<T>>, element: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map(&element).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Wire value of a column type with no dedicated decoding.
struct RawColumn(Vec<u8>);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawColumn(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl RawColumn {
    fn into_json(self) -> Value {
        match String::from_utf8(self.0) {
            Ok(text) => Value::String(text),
            Err(err) => bytes_to_json(err.as_bytes()),
        }
    }
}

fn decode_row(row: &Row) -> DbResult<Entity> {
    let mut entity = Entity::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let get_err = |e| decode_error(name, e);
        let value = match *column.type_() {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(get_err)?.map(Value::from),
            Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(get_err)?.map(Value::from),
            Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(get_err)?.map(Value::from),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(get_err)?.map(Value::from),
            Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(get_err)?.map(Value::from),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(get_err)?.map(Value::from),
            Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx).map_err(get_err)?,
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .map_err(get_err)?
                .map(|ts| Value::from(ts.to_rfc3339())),
            Type::TIMESTAMP => row
                .try_get::<_, Option<NaiveDateTime>>(idx)
                .map_err(get_err)?
                .map(|ts| Value::from(ts.and_utc().to_rfc3339())),
            Type::DATE => row
                .try_get::<_, Option<NaiveDate>>(idx)
                .map_err(get_err)?
                .map(|d| Value::from(d.to_string())),
            Type::UUID => row
                .try_get::<_, Option<Uuid>>(idx)
                .map_err(get_err)?
                .map(|u| Value::from(u.to_string())),
            Type::NUMERIC => row
                .try_get::<_, Option<Decimal>>(idx)
                .map_err(get_err)?
                .map(decimal_to_json),
            Type::BYTEA => row
                .try_get::<_, Option<Vec<u8>>>(idx)
                .map_err(get_err)?
                .map(|b| bytes_to_json(&b)),
            Type::INET => row
                .try_get::<_, Option<IpAddr>>(idx)
                .map_err(get_err)?
                .map(|ip| Value::from(ip.to_string())),
            Type::BOOL_ARRAY => row
                .try_get::<_, Option<Vec<Option<bool>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, Value::from)),
            Type::INT4_ARRAY => row
                .try_get::<_, Option<Vec<Option<i32>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, Value::from)),
            Type::INT8_ARRAY => row
                .try_get::<_, Option<Vec<Option<i64>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, Value::from)),
            Type::FLOAT8_ARRAY => row
                .try_get::<_, Option<Vec<Option<f64>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, Value::from)),
            Type::NUMERIC_ARRAY => row
                .try_get::<_, Option<Vec<Option<Decimal>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, decimal_to_json)),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => row
                .try_get::<_, Option<Vec<Option<String>>>>(idx)
                .map_err(get_err)?
                .map(|items| array_to_json(items, Value::from)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
                .try_get::<_, Option<String>>(idx)
                .map_err(get_err)?
                .map(Value::from),
            _ => row
                .try_get::<_, Option<RawColumn>>(idx)
                .map_err(get_err)?
                .map(RawColumn::into_json),
        };
        entity.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_config_default() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "tabula");
        assert_eq!(config.max_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bind_params_arity_mismatch() {
        let result = bind_params(&[Type::INT4, Type::TEXT], &[json!(1)]);
        assert!(matches!(result, Err(DbError::Bind { index: 2, .. })));
    }

    #[test]
    fn test_bind_value_accepts_coercible_values() {
        assert!(bind_value(1, &Type::INT4, &json!(7)).is_ok());
        assert!(bind_value(1, &Type::INT4, &json!("7")).is_ok());
        assert!(bind_value(1, &Type::INT8, &json!(-3)).is_ok());
        assert!(bind_value(1, &Type::TEXT, &json!(12)).is_ok());
        assert!(bind_value(1, &Type::BOOL, &json!(true)).is_ok());
        assert!(bind_value(1, &Type::JSONB, &json!({"a": [1, 2]})).is_ok());
        assert!(bind_value(1, &Type::TIMESTAMPTZ, &json!("2026-03-01T12:00:00+00:00")).is_ok());
        assert!(bind_value(1, &Type::UUID, &json!("0191c1c2-8f9e-7d6b-a1b2-c3d4e5f60718")).is_ok());
        assert!(bind_value(1, &Type::INT4, &Value::Null).is_ok());
    }

    #[test]
    fn test_bind_value_rejects_mismatched_values() {
        assert!(matches!(
            bind_value(3, &Type::INT4, &json!("abc")),
            Err(DbError::Bind { index: 3, .. })
        ));
        assert!(bind_value(1, &Type::INT2, &json!(70000)).is_err());
        assert!(bind_value(1, &Type::UUID, &json!("not-a-uuid")).is_err());
        assert!(bind_value(1, &Type::TIMESTAMPTZ, &json!("yesterday")).is_err());
        assert!(bind_value(1, &Type::BYTEA, &json!("x")).is_err());
        assert!(bind_value(1, &Type::NUMERIC, &json!("twelve")).is_err());
        assert!(bind_value(1, &Type::INET, &json!("10.0.0")).is_err());
        assert!(bind_value(1, &Type::INT4_ARRAY, &json!([1, "x"])).is_err());
        assert!(matches!(
            bind_value(2, &Type::POINT, &json!("(1,2)")),
            Err(DbError::Bind { index: 2, .. })
        ));
    }

    #[test]
    fn test_bind_value_numeric_and_friends() {
        assert!(bind_value(1, &Type::NUMERIC, &json!(12.5)).is_ok());
        assert!(bind_value(1, &Type::NUMERIC, &json!(7)).is_ok());
        assert!(bind_value(1, &Type::NUMERIC, &json!("19.99")).is_ok());
        assert!(bind_value(1, &Type::NUMERIC, &Value::Null).is_ok());
        assert!(bind_value(1, &Type::BYTEA, &json!("\\xdeadbeef")).is_ok());
        assert!(bind_value(1, &Type::INET, &json!("192.168.0.1")).is_ok());
        assert!(bind_value(1, &Type::INET, &json!("::1")).is_ok());
        assert!(bind_value(1, &Type::TEXT_ARRAY, &json!(["a", null, "c"])).is_ok());
        assert!(bind_value(1, &Type::INT8_ARRAY, &json!([1, 2, 3])).is_ok());
    }

    #[test]
    fn test_numeric_json_shape() {
        assert!(<Decimal as FromSql>::accepts(&Type::NUMERIC));
        assert!(<Decimal as ToSql>::accepts(&Type::NUMERIC));

        let decoded = as_decimal(&json!("10.50")).unwrap();
        assert_eq!(decimal_to_json(decoded), json!(10.5));
        assert_eq!(decimal_to_json(Decimal::from(1200)), json!(1200));
        assert_eq!(as_decimal(&json!(1e3)), Some(Decimal::from(1000)));
    }

    #[test]
    fn test_decode_helpers() {
        assert_eq!(bytes_to_json(&[0xde, 0xad]), json!("\\xdead"));
        assert_eq!(as_bytes(&json!("\\xdead")), Some(vec![0xde, 0xad]));
        assert_eq!(
            array_to_json(vec![Some(1i64), None], Value::from),
            json!([1, null])
        );
        assert_eq!(RawColumn(b"happy".to_vec()).into_json(), json!("happy"));
        assert_eq!(RawColumn(vec![0xff, 0x00]).into_json(), json!("\\xff00"));
        assert!(RawColumn::accepts(&Type::POINT));
    }
}
