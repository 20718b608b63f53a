//! REST API Routes Module
//!
//! Includes:
//! - Generic CRUD routes mounted once per declared resource
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for browser-based clients

pub mod crud;
pub mod health;
pub mod resource;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::ApiConfig, error::ApiResult, manifest::ResourceDefinition, state::AppState};

pub use resource::{crud_router, Methods, ResourceOptions, ResourceState, Validator};

/// Build CORS layer from configuration.
///
/// Conditional-request headers are allowed in, and `ETag`, `Location` and
/// `Last-Modified` are exposed so browser clients can drive updates.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .expose_headers([header::ETAG, header::LOCATION, header::LAST_MODIFIED])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        let cors = cors.allow_origin(origins).allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::IF_MATCH,
            header::IF_NONE_MATCH,
        ]);
        if config.cors_allow_credentials {
            cors.allow_credentials(true)
        } else {
            cors
        }
    }
}

/// Create the complete API router.
///
/// - Each resource under `/<name>` (collection) and `/<name>/:id` (instance)
/// - Health checks at /health/*
/// - Request tracing and CORS on every route
pub fn create_api_router(state: AppState, resources: &[ResourceDefinition]) -> ApiResult<Router> {
    let mut router = Router::new();
    for resource in resources {
        let options = resource.options()?;
        router = router.nest(
            &format!("/{}", resource.name),
            crud_router(&resource.name, &resource.columns, options, &state),
        );
    }

    let cors = build_cors_layer(&state.config);
    let health = health::create_router().with_state(state);

    Ok(router.nest("/health", health).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    ))
}
