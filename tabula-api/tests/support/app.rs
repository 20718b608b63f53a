//! Router harness over `MemoryDatabase` for protocol tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tabula_api::{crud_router, ApiConfig, AppState, ResourceOptions};
use tabula_storage::TagCache;
use tabula_test_utils::fixtures::{items_columns, ITEMS};
use tabula_test_utils::MemoryDatabase;
use tower::ServiceExt;

pub const BASE_URL: &str = "http://api.test";

pub struct TestApp {
    pub router: Router,
    pub db: MemoryDatabase,
    pub cache: Arc<TagCache>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn header(&self, name: HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn etag(&self) -> Option<String> {
        self.header(header::ETAG)
    }

    /// `code` field of an error body.
    pub fn error_code(&self) -> String {
        self.json()["code"].as_str().unwrap_or_default().to_string()
    }
}

impl TestApp {
    /// `items` mounted at `/items` with every method enabled.
    pub fn new(db: MemoryDatabase) -> Self {
        Self::with_options(db, ResourceOptions::default())
    }

    pub fn with_options(db: MemoryDatabase, options: ResourceOptions) -> Self {
        let cache = Arc::new(TagCache::new());
        let state = AppState::with_cache(
            Arc::new(db.clone()),
            Arc::clone(&cache),
            ApiConfig::default().with_base_url(BASE_URL),
        );
        let router = Router::new().nest(
            &format!("/{}", ITEMS),
            crud_router(ITEMS, &items_columns(), options, &state),
        );
        Self { router, db, cache }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(request(Method::GET, uri, &[], None)).await
    }

    pub async fn get_if_none_match(&self, uri: &str, tag: &str) -> TestResponse {
        self.send(request(Method::GET, uri, &[(header::IF_NONE_MATCH, tag)], None))
            .await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, &[], Some(body))).await
    }

    pub async fn put(&self, uri: &str, if_match: Option<&str>, body: Value) -> TestResponse {
        let headers: Vec<(HeaderName, &str)> = if_match
            .map(|tag| vec![(header::IF_MATCH, tag)])
            .unwrap_or_default();
        self.send(request(Method::PUT, uri, &headers, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, if_match: Option<&str>) -> TestResponse {
        let headers: Vec<(HeaderName, &str)> = if_match
            .map(|tag| vec![(header::IF_MATCH, tag)])
            .unwrap_or_default();
        self.send(request(Method::DELETE, uri, &headers, None)).await
    }
}

/// Build a request; a JSON body gets `Content-Type: application/json`.
pub fn request(
    method: Method,
    uri: &str,
    headers: &[(HeaderName, &str)],
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name.clone(), *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("invalid test request")
}

/// Raw-bytes request for malformed bodies and content types.
pub fn raw_request(method: Method, uri: &str, content_type: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("invalid test request")
}
