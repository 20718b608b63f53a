//! Health endpoints mounted under `/health`.
//!
//! `/ping` and `/live` never touch storage. `/ready` pings the database and
//! includes a snapshot of the tag cache.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tabula_storage::TagCache;

use crate::state::{AppState, SharedDatabase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Body of `/live` and `/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<Readiness>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub database: DatabaseProbe,
    pub cache: CacheSnapshot,
}

/// Outcome of one database ping. Driver errors are logged, never returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseProbe {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Point-in-time view of the tag cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Rows with a recorded entity tag.
    pub tagged_rows: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Rows with a write in flight.
    pub write_locks: usize,
}

impl From<&TagCache> for CacheSnapshot {
    fn from(cache: &TagCache) -> Self {
        let stats = cache.stats();
        Self {
            tagged_rows: stats.entry_count,
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
            write_locks: cache.locked_routes(),
        }
    }
}

impl HealthReport {
    fn new(status: HealthStatus, start_time: Instant) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
            readiness: None,
        }
    }
}

/// GET /health/ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health/live - the process is up; storage is not consulted.
pub async fn liveness(State(start_time): State<Instant>) -> Json<HealthReport> {
    Json(HealthReport::new(HealthStatus::Healthy, start_time))
}

/// GET /health/ready - 503 while the database is unreachable.
pub async fn readiness(
    State(db): State<SharedDatabase>,
    State(cache): State<Arc<TagCache>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let database = probe_database(&db).await;
    let status = database.status;

    let mut report = HealthReport::new(status, start_time);
    report.readiness = Some(Readiness {
        database,
        cache: CacheSnapshot::from(cache.as_ref()),
    });
    (status.status_code(), Json(report))
}

async fn probe_database(db: &SharedDatabase) -> DatabaseProbe {
    let start = Instant::now();
    match db.ping().await {
        Ok(()) => DatabaseProbe {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness ping failed");
            DatabaseProbe {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some("Database check failed".to_string()),
            }
        }
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
