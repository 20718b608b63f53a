//! API Configuration Module
//!
//! This module provides configuration for link building, pagination and
//! CORS. Configuration is loaded from environment variables with sensible
//! defaults for development.

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration shared by every resource router.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and authority prefixed to `Location` and pagination links.
    /// Stored without a trailing slash.
    pub base_url: String,

    /// Page size used when a list request has no `limit`.
    pub default_page_size: u64,

    /// Largest accepted `limit`.
    pub max_page_size: u64,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TABULA_BASE_URL`: Link prefix (default: http://localhost:3000)
    /// - `TABULA_DEFAULT_PAGE_SIZE`: List page size when `limit` is absent (default: 10)
    /// - `TABULA_MAX_PAGE_SIZE`: Largest accepted `limit` (default: 50)
    /// - `TABULA_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TABULA_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `TABULA_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        let base_url = std::env::var("TABULA_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_page_size = std::env::var("TABULA_MAX_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(MAX_PAGE_SIZE);

        let default_page_size = std::env::var("TABULA_DEFAULT_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(max_page_size);

        let cors_origins = std::env::var("TABULA_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("TABULA_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("TABULA_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_page_size,
            max_page_size,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        }
    }

    /// Override the link prefix.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Absolute link for a request path: `<base_url><path>`.
    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}
