//! Conditional-request protocol tests for the CRUD handlers.
//!
//! Every test drives a real router over `MemoryDatabase`, so the counters on
//! the database double show exactly when a handler touched storage.

use axum::http::{header, Method, StatusCode};
use serde_json::json;
use tabula_api::{Methods, ResourceOptions};
use tabula_core::{build_delete_by_id, Database, DbError, Query};
use tabula_storage::compute_tag;
use tabula_test_utils::fixtures::{seeded_items, ITEMS};
use tabula_test_utils::MemoryDatabase;

#[path = "support/app.rs"]
mod test_app_support;
use test_app_support::{raw_request, request, TestApp, BASE_URL};

fn count_queries(db: &MemoryDatabase) -> usize {
    db.queries()
        .iter()
        .filter(|q| matches!(q, Query::Count { .. }))
        .count()
}

// ============================================================================
// READ
// ============================================================================

#[tokio::test]
async fn get_returns_entity_with_tag_and_last_modified() {
    let app = TestApp::new(seeded_items(3));

    let response = app.get("/items/2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "item-2");
    assert_eq!(response.json()["price"], 200);

    let row = app.db.row(ITEMS, 2).unwrap();
    assert_eq!(response.etag(), Some(compute_tag(&row).quoted()));
    assert!(response.header(header::LAST_MODIFIED).unwrap().ends_with(" GMT"));
}

#[tokio::test]
async fn get_with_current_tag_is_304_without_database_read() {
    let app = TestApp::new(seeded_items(3));
    let tag = app.get("/items/1").await.etag().unwrap();
    let reads = app.db.reads();

    let response = app.get_if_none_match("/items/1", &tag).await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_empty());
    assert_eq!(response.etag(), Some(tag.clone()));
    assert_eq!(app.db.reads(), reads);

    let weak = format!("W/{}", tag);
    let response = app.get_if_none_match("/items/1", &weak).await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert_eq!(app.db.reads(), reads);
}

#[tokio::test]
async fn get_with_matching_tag_and_cold_cache_is_304() {
    let db = seeded_items(1);
    let tag = compute_tag(&db.row(ITEMS, 1).unwrap()).quoted();
    let app = TestApp::new(db);

    let response = app.get_if_none_match("/items/1", &tag).await;
    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert_eq!(app.db.reads(), 1);
    assert!(app.cache.tag("/items/1").is_some());
}

#[tokio::test]
async fn get_with_stale_tag_returns_body() {
    let app = TestApp::new(seeded_items(1));
    let response = app.get_if_none_match("/items/1", "\"stale\"").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["id"], 1);
}

#[tokio::test]
async fn get_missing_entity_is_404() {
    let app = TestApp::new(seeded_items(1));
    let response = app.get("/items/99").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "ENTITY_NOT_FOUND");
    assert!(app.cache.tag("/items/99").is_none());
}

#[tokio::test]
async fn get_rejects_bad_headers() {
    let app = TestApp::new(seeded_items(1));

    let response = app
        .send(request(
            Method::GET,
            "/items/1",
            &[(header::CONTENT_TYPE, "text/plain")],
            None,
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "UNSUPPORTED_CONTENT_TYPE");

    let response = app.get_if_none_match("/items/1", "unquoted").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_FORMAT");
    assert_eq!(app.db.reads(), 0);
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn post_creates_row_and_invalidates_count() {
    let app = TestApp::new(seeded_items(3));
    app.get("/items").await;
    assert_eq!(app.cache.count(ITEMS), Some(3));

    let response = app.post("/items", json!({"name": "x"})).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.is_empty());
    assert_eq!(
        response.header(header::LOCATION),
        Some(format!("{}/items/4", BASE_URL))
    );
    assert!(response.header(header::LOCATION).unwrap().ends_with("/items/4"));
    assert_eq!(app.cache.count(ITEMS), None);
    assert_eq!(app.db.row(ITEMS, 4).unwrap()["name"], "x");
    assert!(app.cache.tag("/items/4").is_none());
}

#[tokio::test]
async fn post_writes_only_writable_fields() {
    let app = TestApp::with_options(
        seeded_items(0),
        ResourceOptions::default().schema_fields(["name"]),
    );

    let response = app
        .post(
            "/items",
            json!({"id": 99, "name": "x", "price": 5, "created_dt": "1999-01-01T00:00:00Z"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let row = app.db.row(ITEMS, 1).unwrap();
    assert_eq!(row["name"], "x");
    assert!(!row.contains_key("price"));
    assert_ne!(row["created_dt"], "1999-01-01T00:00:00Z");
    assert!(app.db.row(ITEMS, 99).is_none());
}

#[tokio::test]
async fn post_rejects_bad_bodies_before_any_write() {
    let validated = ResourceOptions::default().create_validator(|body| {
        body.get("name")
            .and_then(|v| v.as_str())
            .is_some_and(|name| !name.is_empty())
    });
    let app = TestApp::with_options(seeded_items(0), validated);

    let cases = [
        (raw_request(Method::POST, "/items", "application/json", "{nope"), "INVALID_INPUT"),
        (raw_request(Method::POST, "/items", "application/json", ""), "INVALID_INPUT"),
        (raw_request(Method::POST, "/items", "application/json", "[1, 2]"), "INVALID_INPUT"),
        (
            raw_request(Method::POST, "/items", "text/plain", "{\"name\":\"x\"}"),
            "UNSUPPORTED_CONTENT_TYPE",
        ),
        (
            raw_request(Method::POST, "/items", "application/json", "{\"name\":\"\"}"),
            "VALIDATION_FAILED",
        ),
    ];
    for (req, code) in cases {
        let response = app.send(req).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_code(), code);
    }
    assert_eq!(app.db.writes(), 0);
}

// ============================================================================
// UPDATE
// ============================================================================

#[tokio::test]
async fn put_with_current_tag_updates_and_returns_new_tag() {
    let app = TestApp::new(seeded_items(2));
    let old = app.get("/items/1").await.etag().unwrap();

    let response = app
        .put("/items/1", Some(&old), json!({"id": 1, "name": "renamed", "price": 7}))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let new = response.etag().unwrap();
    assert_ne!(new, old);

    let row = app.db.row(ITEMS, 1).unwrap();
    assert_eq!(row["name"], "renamed");
    assert!(row["updated_dt"].is_string());
    assert_eq!(new, compute_tag(&row).quoted());

    let fetched = app.get("/items/1").await;
    assert_eq!(fetched.etag(), Some(new));
    assert_eq!(fetched.json()["price"], 7);
}

#[tokio::test]
async fn put_with_stale_tag_is_412_and_leaves_row() {
    let app = TestApp::new(seeded_items(1));
    app.get("/items/1").await;
    let before = app.db.row(ITEMS, 1).unwrap();

    let response = app
        .put("/items/1", Some("\"stale\""), json!({"id": 1, "name": "lost"}))
        .await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(response.error_code(), "PRECONDITION_FAILED");
    assert_eq!(app.db.row(ITEMS, 1).unwrap(), before);
    assert_eq!(app.db.writes(), 0);

    let response = app.put("/items/1", None, json!({"id": 1, "name": "lost"})).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn put_with_cold_cache_reads_current_tag() {
    let db = seeded_items(1);
    let tag = compute_tag(&db.row(ITEMS, 1).unwrap()).quoted();
    let app = TestApp::new(db);

    let response = app
        .put("/items/1", Some(&tag), json!({"id": "1", "name": "fresh"}))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.row(ITEMS, 1).unwrap()["name"], "fresh");
}

#[tokio::test]
async fn put_missing_entity_is_404() {
    let app = TestApp::new(seeded_items(1));
    let response = app.put("/items/9", Some("*"), json!({"id": 9, "name": "x"})).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.db.writes(), 0);
}

#[tokio::test]
async fn put_rejects_mismatched_body_id() {
    let app = TestApp::new(seeded_items(2));
    let tag = app.get("/items/1").await.etag().unwrap();

    let response = app.put("/items/1", Some(&tag), json!({"id": 2, "name": "x"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_FAILED");
    assert_eq!(app.db.writes(), 0);
    assert_eq!(app.db.row(ITEMS, 2).unwrap()["name"], "item-2");

    let response = app.put("/items/1", Some(&tag), json!({"name": "no-id"})).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.row(ITEMS, 1).unwrap()["name"], "no-id");
}

#[tokio::test]
async fn put_runs_update_validator() {
    let options = ResourceOptions::default().update_validator(|body| !body.contains_key("price"));
    let app = TestApp::with_options(seeded_items(1), options);
    let tag = app.get("/items/1").await.etag().unwrap();

    let response = app
        .put("/items/1", Some(&tag), json!({"id": 1, "name": "x", "price": 1}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_FAILED");
    assert_eq!(app.db.writes(), 0);
}

#[tokio::test]
async fn concurrent_puts_with_same_tag_admit_one_writer() {
    let app = TestApp::new(seeded_items(1));
    let tag = app.get("/items/1").await.etag().unwrap();

    let (first, second) = tokio::join!(
        app.put("/items/1", Some(&tag), json!({"id": 1, "name": "a"})),
        app.put("/items/1", Some(&tag), json!({"id": 1, "name": "b"})),
    );
    let mut statuses = vec![first.status, second.status];
    statuses.sort();
    assert_eq!(
        statuses,
        vec![StatusCode::NO_CONTENT, StatusCode::PRECONDITION_FAILED]
    );
    assert_eq!(app.cache.locked_routes(), 0);
}

#[tokio::test]
async fn alternate_id_spellings_share_one_tag() {
    let app = TestApp::new(seeded_items(1));
    let original = app.get("/items/1").await.etag().unwrap();

    let response = app
        .put("/items/01", Some(&original), json!({"name": "from-a"}))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let current = response.etag().unwrap();

    let response = app
        .put("/items/1", Some(&original), json!({"name": "from-b"}))
        .await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(app.db.row(ITEMS, 1).unwrap()["name"], "from-a");

    let response = app.get_if_none_match("/items/%31", &original).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.etag(), Some(current.clone()));

    let response = app.delete("/items/+1", Some(&original)).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert!(app.db.row(ITEMS, 1).is_some());
    assert!(app.cache.tag("/items/01").is_none());
}

#[tokio::test]
async fn writes_without_if_match_never_reach_storage() {
    let app = TestApp::new(seeded_items(1));

    let response = app.put("/items/1", None, json!({"name": "x"})).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);

    let response = app.delete("/items/1", None).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);

    let response = app.delete("/items/99", None).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);

    assert_eq!(app.db.reads(), 0);
    assert_eq!(app.db.writes(), 0);
    assert!(app.cache.tag("/items/1").is_none());
}

// ============================================================================
// DELETE
// ============================================================================

#[tokio::test]
async fn delete_with_current_tag_removes_row() {
    let app = TestApp::new(seeded_items(2));
    app.get("/items").await;
    let tag = app.get("/items/1").await.etag().unwrap();

    let response = app.delete("/items/1", Some(&tag)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    assert!(app.cache.tag("/items/1").is_none());
    assert_eq!(app.cache.count(ITEMS), None);

    assert_eq!(app.get("/items/1").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.delete("/items/1", Some(&tag)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.db.row_count(ITEMS), 1);
}

#[tokio::test]
async fn delete_with_stale_tag_is_412() {
    let app = TestApp::new(seeded_items(1));
    app.get("/items/1").await;

    let response = app.delete("/items/1", Some("\"stale\"")).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert!(app.db.row(ITEMS, 1).is_some());

    let response = app.delete("/items/1", None).await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(app.db.writes(), 0);
}

#[tokio::test]
async fn delete_with_cached_tag_of_vanished_row_is_404() {
    let app = TestApp::new(seeded_items(1));
    let tag = app.get("/items/1").await.etag().unwrap();
    app.db
        .execute(&build_delete_by_id(json!(1), ITEMS))
        .await
        .unwrap();

    let response = app.delete("/items/1", Some(&tag)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// LIST
// ============================================================================

#[tokio::test]
async fn list_middle_page_has_both_links() {
    let app = TestApp::new(seeded_items(12));

    let response = app.get("/items?limit=5&offset=5").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();

    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![6, 7, 8, 9, 10]);
    assert_eq!(body["meta"]["total"], 12);
    assert_eq!(body["meta"]["offset"], 5);
    assert_eq!(body["meta"]["limit"], 5);
    assert_eq!(
        body["meta"]["next"],
        format!("{}/items?limit=5&offset=10", BASE_URL)
    );
    assert_eq!(
        body["meta"]["previous"],
        format!("{}/items?limit=5&offset=0", BASE_URL)
    );
}

#[tokio::test]
async fn list_first_and_last_pages_omit_links() {
    let app = TestApp::new(seeded_items(12));

    let first = app.get("/items").await.json();
    assert_eq!(first["data"].as_array().unwrap().len(), 10);
    assert!(first["meta"]["previous"].is_null());
    assert_eq!(
        first["meta"]["next"],
        format!("{}/items?limit=10&offset=10", BASE_URL)
    );

    let last = app.get("/items?limit=5&offset=10").await.json();
    assert_eq!(last["data"].as_array().unwrap().len(), 2);
    assert!(last["meta"]["next"].is_null());
    assert_eq!(
        last["meta"]["previous"],
        format!("{}/items?limit=5&offset=5", BASE_URL)
    );
}

#[tokio::test]
async fn list_rejects_bad_paging() {
    let app = TestApp::new(seeded_items(3));

    for (uri, code) in [
        ("/items?limit=100", "INVALID_RANGE"),
        ("/items?limit=0", "INVALID_RANGE"),
        ("/items?limit=ten", "INVALID_FORMAT"),
        ("/items?offset=-1", "INVALID_FORMAT"),
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.error_code(), code, "{}", uri);
    }
    assert_eq!(app.db.reads(), 0);
}

#[tokio::test]
async fn list_caches_count_including_zero() {
    let app = TestApp::new(seeded_items(0));

    let body = app.get("/items").await.json();
    assert_eq!(body["meta"]["total"], 0);
    assert_eq!(body["data"], json!([]));
    assert_eq!(app.cache.count(ITEMS), Some(0));

    app.get("/items").await;
    assert_eq!(count_queries(&app.db), 1);

    app.post("/items", json!({"name": "x"})).await;
    let body = app.get("/items").await.json();
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(count_queries(&app.db), 2);
}

// ============================================================================
// ROUTING AND FAILURES
// ============================================================================

#[tokio::test]
async fn disabled_methods_are_not_routed() {
    let app = TestApp::with_options(
        seeded_items(1),
        ResourceOptions::default().methods(Methods::GET),
    );

    assert_eq!(app.get("/items/1").await.status, StatusCode::OK);
    assert_eq!(
        app.post("/items", json!({"name": "x"})).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        app.delete("/items/1", Some("*")).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(app.db.writes(), 0);
}

#[tokio::test]
async fn database_failures_do_not_leak_details() {
    let app = TestApp::new(seeded_items(1));

    app.db.fail_next(DbError::QueryFailed {
        reason: "relation secret_table does not exist".to_string(),
    });
    let response = app.get("/items/1").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "DATABASE_ERROR");
    assert!(!String::from_utf8_lossy(&response.body).contains("secret_table"));

    app.db.fail_next(DbError::PoolExhausted);
    let response = app.get("/items/1").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.error_code(), "CONNECTION_POOL_EXHAUSTED");

    app.db.set_available(false);
    let response = app.post("/items", json!({"name": "x"})).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.error_code(), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn insert_without_returned_id_is_500() {
    let app = TestApp::new(seeded_items(3));
    app.get("/items").await;

    app.db.omit_next_insert_id();
    let response = app.post("/items", json!({"name": "x"})).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "INTERNAL_ERROR");
    assert!(response.header(header::LOCATION).is_none());
    assert_eq!(app.cache.count(ITEMS), Some(3));
}

#[tokio::test]
async fn update_touching_no_row_is_500_and_keeps_cache() {
    let app = TestApp::new(seeded_items(2));
    app.get("/items").await;
    let tag = app.get("/items/1").await.etag().unwrap();

    app.db.report_next_affected(0);
    let response = app.put("/items/1", Some(&tag), json!({"name": "x"})).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "INTERNAL_ERROR");
    assert!(response.etag().is_none());

    assert_eq!(app.cache.tag("/items/1").map(|t| t.quoted()), Some(tag));
    assert_eq!(app.cache.count(ITEMS), Some(2));
    assert_eq!(app.db.row(ITEMS, 1).unwrap()["name"], "item-1");
    assert_eq!(app.cache.locked_routes(), 0);
}

#[tokio::test]
async fn delete_touching_several_rows_is_500_and_keeps_cache() {
    let app = TestApp::new(seeded_items(2));
    app.get("/items").await;
    let tag = app.get("/items/2").await.etag().unwrap();

    app.db.report_next_affected(2);
    let response = app.delete("/items/2", Some(&tag)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "INTERNAL_ERROR");

    assert_eq!(app.cache.tag("/items/2").map(|t| t.quoted()), Some(tag));
    assert_eq!(app.cache.count(ITEMS), Some(2));
    assert_eq!(app.db.row_count(ITEMS), 2);
}
