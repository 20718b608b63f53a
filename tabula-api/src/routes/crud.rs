//! CRUD handlers shared by every resource router.
//!
//! Each handler reads its resource from `State<Arc<ResourceState>>`, so one
//! set of functions serves any table. Conditional-request bookkeeping goes
//! through the shared [`TagCache`](tabula_storage::TagCache), keyed by
//! [`ResourceState::row_key`] so every spelling of an id maps to one entry:
//!
//! - `GET /:id` records the tag it served and answers `If-None-Match` with
//!   304 straight from the cache when it can.
//! - `PUT /:id` and `DELETE /:id` hold the route lock for the whole
//!   compare-and-write and require a strongly matching `If-Match`. A missing
//!   `If-Match` is rejected before storage is touched.
//! - Any successful write invalidates the table's cached row count.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::{
    build_count, build_delete_by_id, build_find_by_id, build_find_page, build_insert,
    build_update_by_id, id_value, value_to_string, Entity, CREATED_COLUMN, ID_COLUMN,
    UPDATED_COLUMN,
};
use tabula_storage::EntityTag;

use super::resource::ResourceState;
use crate::conditional::if_none_match;
use crate::constants::HTTP_DATE_FORMAT;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{EntityId, RoutePath};
use crate::guard::{
    require_current, require_if_match, require_json_content_type, require_matching_body_id,
    require_object_body, require_page, require_valid, write_subset,
};

// ============================================================================
// TYPES
// ============================================================================

/// Raw list query parameters; validated by [`require_page`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: Vec<Entity>,
    pub meta: ListMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    /// Absolute link to the following page, if any rows remain.
    pub next: Option<String>,
    /// Absolute link to the preceding page; `None` on the first page.
    pub previous: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET / - One page of rows ordered by id, with paging links.
pub async fn retrieve_all(
    State(state): State<Arc<ResourceState>>,
    RoutePath(path): RoutePath,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let config = &state.app.config;
    let page = require_page(
        params.limit.as_deref(),
        params.offset.as_deref(),
        config.default_page_size,
        config.max_page_size,
    )?;

    let data = state
        .app
        .db
        .many(&build_find_page(&state.table, None, page.limit, page.offset))
        .await?;
    let total = table_count(&state).await?;

    let link = |offset: u64| config.link(&format!("{}?limit={}&offset={}", path, page.limit, offset));
    let next = (page.offset.saturating_add(page.limit) < total)
        .then(|| link(page.offset + page.limit));
    let previous = (page.offset > 0).then(|| link(page.offset.saturating_sub(page.limit)));

    tracing::debug!(
        table = %state.table,
        total,
        offset = page.offset,
        limit = page.limit,
        returned = data.len(),
        "Listed rows"
    );

    Ok(Json(ListResponse {
        data,
        meta: ListMeta {
            total,
            offset: page.offset,
            limit: page.limit,
            next,
            previous,
        },
    }))
}

/// GET /:id - One row with `ETag` and `Last-Modified`; 304 on a tag match.
pub async fn retrieve(
    State(state): State<Arc<ResourceState>>,
    EntityId(id): EntityId,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_json_content_type(&headers)?;
    let condition = if_none_match(&headers)?;
    let route = state.row_key(&id);
    let cached = state.app.cache.tag(&route);

    if let (Some(condition), Some(tag)) = (&condition, &cached) {
        if condition.matches_weak(tag) {
            tracing::debug!(route = %route, "Served 304 from cached tag");
            return not_modified(tag);
        }
    }

    let row = find_row(&state, &id).await?;
    let tag = match cached {
        Some(tag) => tag,
        None => state.app.cache.record_tag(&route, &row),
    };

    if condition.is_some_and(|c| c.matches_weak(&tag)) {
        return not_modified(&tag);
    }

    let last_modified = last_modified(&row);
    let mut response = Json(row).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(header::ETAG, tag_header(&tag)?);
    if let Some(value) = last_modified {
        response_headers.insert(header::LAST_MODIFIED, value);
    }
    Ok(response)
}

/// POST / - Insert the writable subset of the body; 201 with `Location`.
pub async fn create(
    State(state): State<Arc<ResourceState>>,
    RoutePath(path): RoutePath,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    require_json_content_type(&headers)?;
    let body = require_object_body(&body)?;
    require_valid(state.options.create_validator.as_deref(), &body)?;

    let values = write_subset(&body, &state.write_fields);
    let inserted = state
        .app
        .db
        .one_or_none(&build_insert(&state.table, &values))
        .await?;

    let id = match inserted.as_ref().and_then(|row| row.get(ID_COLUMN)) {
        Some(id) if !id.is_null() => value_to_string(id),
        _ => {
            tracing::error!(table = %state.table, "Insert returned no id");
            return Err(ApiError::internal_error("Insert did not return an id"));
        }
    };
    state.app.cache.invalidate_count(&state.table);

    let location = state.app.config.link(&format!("{}/{}", path, id));
    let location = HeaderValue::from_str(&location)
        .map_err(|_| ApiError::internal_error("Location is not a valid header value"))?;

    tracing::debug!(table = %state.table, id = %id, "Created row");
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

/// PUT /:id - Conditional update; 204 with the new `ETag`.
pub async fn update(
    State(state): State<Arc<ResourceState>>,
    EntityId(id): EntityId,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    require_json_content_type(&headers)?;
    let condition = require_if_match(&headers)?;
    let body = require_object_body(&body)?;
    let route = state.row_key(&id);

    let _guard = state.app.cache.lock_route(&route).await;
    let (current, _) = current_tag(&state, &route, &id).await?;
    require_current(&condition, &current).inspect_err(|_| {
        tracing::warn!(route = %route, current = %current, "Rejected stale update");
    })?;
    require_matching_body_id(&body, &id)?;
    require_valid(state.options.update_validator.as_deref(), &body)?;

    let mut values = write_subset(&body, &state.write_fields);
    values.remove(ID_COLUMN);
    values.insert(UPDATED_COLUMN.to_string(), Value::String(Utc::now().to_rfc3339()));

    let affected = state
        .app
        .db
        .execute(&build_update_by_id(id_value(&id), &values, &state.table))
        .await?;
    require_single_row(&state, &id, affected)?;

    let refreshed = state
        .app
        .db
        .one_or_none(&build_find_by_id(id_value(&id), &state.table, None))
        .await?;
    let tag = match refreshed {
        Some(row) => Some(state.app.cache.update_tag(&route, &row)),
        None => {
            state.app.cache.clear_tag(&route);
            None
        }
    };
    state.app.cache.invalidate_count(&state.table);

    tracing::debug!(route = %route, "Updated row");
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(tag) = tag {
        response.headers_mut().insert(header::ETAG, tag_header(&tag)?);
    }
    Ok(response)
}

/// DELETE /:id - Conditional delete; 200 with an empty body.
pub async fn remove(
    State(state): State<Arc<ResourceState>>,
    EntityId(id): EntityId,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let condition = require_if_match(&headers)?;
    let route = state.row_key(&id);

    let _guard = state.app.cache.lock_route(&route).await;
    let (current, row_read) = current_tag(&state, &route, &id).await?;
    require_current(&condition, &current).inspect_err(|_| {
        tracing::warn!(route = %route, current = %current, "Rejected stale delete");
    })?;

    // A cached tag may outlive its row.
    if !row_read {
        find_row(&state, &id).await?;
    }

    let affected = state
        .app
        .db
        .execute(&build_delete_by_id(id_value(&id), &state.table))
        .await?;
    require_single_row(&state, &id, affected)?;

    state.app.cache.clear_tag(&route);
    state.app.cache.invalidate_count(&state.table);

    tracing::debug!(route = %route, "Deleted row");
    Ok(StatusCode::OK.into_response())
}

// ============================================================================
// HELPERS
// ============================================================================

async fn find_row(state: &ResourceState, id: &str) -> ApiResult<Entity> {
    state
        .app
        .db
        .one_or_none(&build_find_by_id(id_value(id), &state.table, None))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(&state.table, id))
}

/// Tag the client must match, plus whether the row was read to get it.
async fn current_tag(state: &ResourceState, route: &str, id: &str) -> ApiResult<(EntityTag, bool)> {
    if let Some(tag) = state.app.cache.tag(route) {
        return Ok((tag, false));
    }
    let row = find_row(state, id).await?;
    Ok((state.app.cache.record_tag(route, &row), true))
}

async fn table_count(state: &ResourceState) -> ApiResult<u64> {
    if let Some(total) = state.app.cache.count(&state.table) {
        return Ok(total);
    }

    let row = state.app.db.one(&build_count(&state.table)).await?;
    let total = row
        .get("total")
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| ApiError::internal_error("Count query returned no total"))?;
    state.app.cache.set_count(&state.table, total);
    Ok(total)
}

fn require_single_row(state: &ResourceState, id: &str, affected: u64) -> ApiResult<()> {
    if affected == 1 {
        return Ok(());
    }
    tracing::error!(table = %state.table, id, affected, "Write touched an unexpected number of rows");
    Err(ApiError::internal_error(format!(
        "Expected one row to change, {} did",
        affected
    )))
}

fn tag_header(tag: &EntityTag) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&tag.quoted())
        .map_err(|_| ApiError::internal_error("Entity tag is not a valid header value"))
}

fn not_modified(tag: &EntityTag) -> ApiResult<Response> {
    Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, tag_header(tag)?)]).into_response())
}

/// `updated_dt`, else `created_dt`, as an HTTP date. Unparseable stamps are skipped.
fn last_modified(row: &Entity) -> Option<HeaderValue> {
    let stamp = [UPDATED_COLUMN, CREATED_COLUMN]
        .iter()
        .find_map(|column| row.get(*column).and_then(Value::as_str))?;
    let parsed = DateTime::parse_from_rfc3339(stamp).ok()?;
    let formatted = parsed.with_timezone(&Utc).format(HTTP_DATE_FORMAT).to_string();
    HeaderValue::from_str(&formatted).ok()
}
