//! Guard clauses shared by the CRUD handlers.
//!
//! Each guard inspects one aspect of the request and either passes a value
//! through or returns the `ApiError` the handler should respond with. They
//! never touch the database.

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use serde_json::Value;
use tabula_core::{id_value, value_to_string, Entity, ID_COLUMN};
use tabula_storage::EntityTag;

use crate::conditional::{if_match, TagCondition};
use crate::constants::JSON_MEDIA_TYPE;
use crate::error::{ApiError, ApiResult};

/// Content type must be absent or `application/json` (parameters allowed).
pub fn require_json_content_type(headers: &HeaderMap) -> ApiResult<()> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::unsupported_content_type("<non-ascii>"))?;
    let media_type = raw.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
        Ok(())
    } else {
        Err(ApiError::unsupported_content_type(raw))
    }
}

/// Body must be a non-empty JSON object.
pub fn require_object_body(body: &Bytes) -> ApiResult<Entity> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::invalid_input("Request body is empty"));
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) if !map.is_empty() => Ok(map),
        Value::Object(_) => Err(ApiError::invalid_input("Request body is an empty object")),
        _ => Err(ApiError::invalid_input("Request body must be a JSON object")),
    }
}

/// `If-Match` must be present; checked before any storage lookup.
pub fn require_if_match(headers: &HeaderMap) -> ApiResult<TagCondition> {
    if_match(headers)?.ok_or_else(|| ApiError::precondition_failed("If-Match header is required"))
}

/// The `If-Match` condition must strongly match the current tag.
pub fn require_current(condition: &TagCondition, current: &EntityTag) -> ApiResult<()> {
    if condition.matches_strong(current) {
        Ok(())
    } else {
        Err(ApiError::precondition_failed(
            "If-Match does not match the current entity tag",
        ))
    }
}

/// A body-level `id`, if given, must name the same row as the path id.
pub fn require_matching_body_id(body: &Entity, path_id: &str) -> ApiResult<()> {
    let normalized = |raw: &str| value_to_string(&id_value(raw.trim()));
    match body.get(ID_COLUMN) {
        None | Some(Value::Null) => Ok(()),
        Some(id) if normalized(&value_to_string(id)) == normalized(path_id) => Ok(()),
        Some(id) => Err(ApiError::validation_failed(format!(
            "Body id {} does not match path id {}",
            value_to_string(id),
            path_id
        ))),
    }
}

/// Run an optional validator; `false` rejects the body.
pub fn require_valid(
    validator: Option<&(dyn Fn(&Entity) -> bool + Send + Sync)>,
    body: &Entity,
) -> ApiResult<()> {
    match validator {
        Some(validate) if !validate(body) => {
            Err(ApiError::validation_failed("Request body failed validation"))
        }
        _ => Ok(()),
    }
}

/// Columns of `body` the resource lets clients write.
pub fn write_subset(body: &Entity, fields: &[String]) -> Entity {
    fields
        .iter()
        .filter_map(|f| body.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Validated `limit` / `offset` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

/// Parse raw `limit` / `offset` query values.
pub fn require_page(
    limit: Option<&str>,
    offset: Option<&str>,
    default_limit: u64,
    max_limit: u64,
) -> ApiResult<PageRequest> {
    let limit = match limit.map(str::trim) {
        None | Some("") => default_limit,
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ApiError::invalid_format("limit", "a non-negative integer"))?,
    };
    if limit == 0 || limit > max_limit {
        return Err(ApiError::invalid_range("limit", 1, max_limit));
    }

    let offset = match offset.map(str::trim) {
        None | Some("") => 0,
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ApiError::invalid_format("offset", "a non-negative integer"))?,
    };

    Ok(PageRequest { limit, offset })
}
