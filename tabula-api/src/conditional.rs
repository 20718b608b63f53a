//! Conditional request headers.
//!
//! Parses `If-Match` / `If-None-Match` into a [`TagCondition`] and compares
//! it against the entity tag owned by the tag cache. `If-Match` uses strong
//! comparison; `If-None-Match` uses weak comparison, so `W/"x"` matches `"x"`.

use axum::http::{header, HeaderMap, HeaderName};
use tabula_storage::EntityTag;
use thiserror::Error;

use crate::error::ApiError;

/// Malformed conditional header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("{header} is not valid visible ASCII")]
    NotAscii { header: &'static str },

    #[error("{header} contains an unquoted entity tag: {fragment}")]
    Unquoted {
        header: &'static str,
        fragment: String,
    },

    #[error("{header} is empty")]
    Empty { header: &'static str },
}

impl From<ConditionError> for ApiError {
    fn from(err: ConditionError) -> Self {
        ApiError::invalid_format("conditional header", &err.to_string())
    }
}

/// One entry of a tag list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedTag {
    pub weak: bool,
    pub opaque: String,
}

/// Parsed `If-Match` / `If-None-Match` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCondition {
    /// `*`: any current representation.
    Any,
    Tags(Vec<ListedTag>),
}

impl TagCondition {
    /// Strong comparison: weak list entries never match.
    pub fn matches_strong(&self, current: &EntityTag) -> bool {
        match self {
            TagCondition::Any => true,
            TagCondition::Tags(tags) => tags
                .iter()
                .any(|t| !t.weak && t.opaque == current.as_str()),
        }
    }

    /// Weak comparison: opaque values only.
    pub fn matches_weak(&self, current: &EntityTag) -> bool {
        match self {
            TagCondition::Any => true,
            TagCondition::Tags(tags) => tags.iter().any(|t| t.opaque == current.as_str()),
        }
    }
}

/// Parse a raw header value.
pub fn parse_condition(header: &'static str, raw: &str) -> Result<TagCondition, ConditionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConditionError::Empty { header });
    }
    if raw == "*" {
        return Ok(TagCondition::Any);
    }

    let mut tags = Vec::new();
    for fragment in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let (weak, quoted) = match fragment.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, fragment),
        };
        let opaque = quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .filter(|s| !s.contains('"'))
            .ok_or_else(|| ConditionError::Unquoted {
                header,
                fragment: fragment.to_string(),
            })?;
        tags.push(ListedTag {
            weak,
            opaque: opaque.to_string(),
        });
    }

    if tags.is_empty() {
        return Err(ConditionError::Empty { header });
    }
    Ok(TagCondition::Tags(tags))
}

fn condition(
    headers: &HeaderMap,
    name: &HeaderName,
    label: &'static str,
) -> Result<Option<TagCondition>, ConditionError> {
    let mut values = headers.get_all(name).iter().peekable();
    if values.peek().is_none() {
        return Ok(None);
    }

    // Repeated header lines are one comma-separated list.
    let mut joined = Vec::new();
    for value in values {
        let value = value
            .to_str()
            .map_err(|_| ConditionError::NotAscii { header: label })?;
        joined.push(value);
    }
    parse_condition(label, &joined.join(",")).map(Some)
}

/// `If-Match`, if present.
pub fn if_match(headers: &HeaderMap) -> Result<Option<TagCondition>, ConditionError> {
    condition(headers, &header::IF_MATCH, "If-Match")
}

/// `If-None-Match`, if present.
pub fn if_none_match(headers: &HeaderMap) -> Result<Option<TagCondition>, ConditionError> {
    condition(headers, &header::IF_NONE_MATCH, "If-None-Match")
}
