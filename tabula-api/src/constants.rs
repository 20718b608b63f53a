//! Constants for Tabula API
//!
//! Defaults shared by configuration, handlers and the server binary.

// ============================================================================
// PAGINATION
// ============================================================================

/// Default page size for list operations
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum page size for list operations
pub const MAX_PAGE_SIZE: u64 = 50;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// SERVER
// ============================================================================

/// Base URL used to build absolute `Location` and pagination links
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

/// Resource manifest read at startup
pub const DEFAULT_MANIFEST_PATH: &str = "resources.yaml";

// ============================================================================
// DATABASE
// ============================================================================

pub const DEFAULT_DB_POOL_SIZE: usize = 16;

pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// HTTP
// ============================================================================

/// The only accepted request body media type
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// `Last-Modified` date format (IMF-fixdate)
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
