//! Entity tags.
//!
//! A tag is the hex SHA-256 of the entity's canonical JSON with the audit
//! columns removed. `serde_json::Map` keeps keys sorted, so identical domain
//! content always serializes to identical bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tabula_core::{Entity, AUDIT_COLUMNS};

/// Opaque fingerprint of an entity's domain fields.
///
/// Stored unquoted; [`EntityTag::quoted`] gives the header form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTag(String);

impl EntityTag {
    /// Wrap an already-computed opaque value.
    pub fn from_opaque(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header form: `"<opaque>"`.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

/// Compute the tag for an entity, ignoring audit columns.
pub fn compute_tag(entity: &Entity) -> EntityTag {
    let mut domain = entity.clone();
    for column in AUDIT_COLUMNS {
        domain.remove(column);
    }

    let mut hasher = Sha256::new();
    // Writing a Map<String, Value> into a Vec cannot fail.
    let canonical = serde_json::to_vec(&domain).unwrap_or_default();
    hasher.update(&canonical);
    EntityTag(hex::encode(hasher.finalize()))
}
