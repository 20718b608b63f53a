//! Resource manifest.
//!
//! The server binary learns which tables to expose from a YAML file:
//!
//! ```yaml
//! resources:
//!   - name: items
//!     columns:
//!       name: text not null
//!       price: integer
//!     methods: [GET, POST, PUT, DELETE]
//!     schema_fields: [name, price]
//!     provision: true
//! ```
//!
//! Names are interpolated into SQL, so every resource, column and field name
//! must be a plain identifier.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_core::{build_create_table_if_absent, build_schema, Database, Schema};
use thiserror::Error;

use crate::error::ApiError;
use crate::routes::{Methods, ResourceOptions};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("resource '{0}' is declared more than once")]
    DuplicateResource(String),

    #[error("resource '{resource}' lists unknown field '{field}'")]
    UnknownField { resource: String, field: String },

    #[error("resource '{resource}': {reason}")]
    InvalidMethods { resource: String, reason: String },
}

impl From<ManifestError> for ApiError {
    fn from(err: ManifestError) -> Self {
        tracing::error!("Resource manifest error: {}", err);
        ApiError::validation_failed(err.to_string())
    }
}

/// Top-level manifest document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceManifest {
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
}

/// One exposed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefinition {
    /// Table name and mount point (`/<name>`).
    pub name: String,
    /// Caller columns; identity and audit columns are added automatically.
    #[serde(default)]
    pub columns: Schema,
    /// Enabled methods; all when absent.
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub schema_fields: Option<Vec<String>>,
    /// Create the table at startup when it does not exist.
    #[serde(default)]
    pub provision: bool,
}

impl ResourceDefinition {
    /// Router options for this resource.
    pub fn options(&self) -> Result<ResourceOptions, ManifestError> {
        let mut options = ResourceOptions::default();
        if let Some(names) = &self.methods {
            let methods =
                Methods::from_names(names).map_err(|reason| ManifestError::InvalidMethods {
                    resource: self.name.clone(),
                    reason,
                })?;
            options = options.methods(methods);
        }
        if let Some(fields) = &self.schema_fields {
            options = options.schema_fields(fields.iter().cloned());
        }
        Ok(options)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        require_identifier(&self.name)?;
        for column in self.columns.names() {
            require_identifier(column)?;
        }

        let schema = build_schema(&self.columns);
        for field in self.schema_fields.iter().flatten() {
            if !schema.contains(field) {
                return Err(ManifestError::UnknownField {
                    resource: self.name.clone(),
                    field: field.clone(),
                });
            }
        }
        self.options().map(|_| ())
    }
}

impl ResourceManifest {
    /// Read and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: ResourceManifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;
            if !seen.insert(resource.name.as_str()) {
                return Err(ManifestError::DuplicateResource(resource.name.clone()));
            }
        }
        Ok(())
    }
}

/// Plain SQL identifier: a letter or `_`, then letters, digits or `_`.
fn require_identifier(name: &str) -> Result<(), ManifestError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidIdentifier(name.to_string()))
    }
}

/// Create every `provision: true` table that does not exist yet.
///
/// Returns the number of resources provisioned.
pub async fn provision(db: &dyn Database, manifest: &ResourceManifest) -> Result<usize, ApiError> {
    let mut provisioned = 0;
    for resource in manifest.resources.iter().filter(|r| r.provision) {
        let ddl = build_create_table_if_absent(&resource.name, &build_schema(&resource.columns), &[]);
        db.execute_ddl(&ddl).await?;
        tracing::info!(table = %resource.name, "Provisioned table");
        provisioned += 1;
    }
    Ok(provisioned)
}
