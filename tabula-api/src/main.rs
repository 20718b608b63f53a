use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tabula_api::constants::{DEFAULT_BIND_HOST, DEFAULT_MANIFEST_PATH, DEFAULT_PORT};
use tabula_api::telemetry::{init_tracing, TelemetryConfig};
use tabula_api::{
    create_api_router, provision, ApiConfig, ApiError, ApiResult, AppState, DbClient, DbConfig,
    ResourceManifest,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let manifest_path = std::env::var("TABULA_RESOURCES")
        .unwrap_or_else(|_| DEFAULT_MANIFEST_PATH.to_string());
    let manifest = ResourceManifest::load(&manifest_path)?;
    tracing::info!(
        path = %manifest_path,
        resources = manifest.resources.len(),
        "Loaded resource manifest"
    );

    let db_config = DbConfig::from_env();
    let db = Arc::new(DbClient::from_config(&db_config)?);
    tracing::info!(
        host = %db_config.host,
        dbname = %db_config.dbname,
        max_size = db_config.max_size,
        pool_size = db.pool_size(),
        "Database pool created"
    );
    provision(db.as_ref(), &manifest).await?;

    let api_config = ApiConfig::from_env();
    let state = AppState::new(db, api_config);
    let app: Router = create_api_router(state, &manifest.resources)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Tabula API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("TABULA_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("TABULA_API_PORT").ok())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
