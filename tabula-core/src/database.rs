//! The database collaborator seam.
//!
//! Handlers only talk to a database through this trait. The Postgres client
//! lives in the API crate; an in-memory double lives in the test utilities.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::query::Query;

/// Parameterized query execution with the result shapes handlers need.
#[async_trait]
pub trait Database: Send + Sync {
    /// Zero or one row.
    async fn one_or_none(&self, query: &Query) -> DbResult<Option<Entity>>;

    /// All returned rows.
    async fn many(&self, query: &Query) -> DbResult<Vec<Entity>>;

    /// Number of rows affected by a write.
    async fn execute(&self, query: &Query) -> DbResult<u64>;

    /// Run DDL text verbatim.
    async fn execute_ddl(&self, ddl: &str) -> DbResult<()>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> DbResult<()>;

    /// Exactly one row; anything else is an error.
    async fn one(&self, query: &Query) -> DbResult<Entity> {
        let mut rows = self.many(query).await?;
        if rows.len() != 1 {
            return Err(DbError::UnexpectedRowCount { got: rows.len() });
        }
        Ok(rows.remove(0))
    }
}
