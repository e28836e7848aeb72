//! Centralized default constants for docshelf.
//!
//! Every tunable the core and the store implementations share lives here so
//! that configuration layers and tests agree on the same values.

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum accepted upload size in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Chunk size used when streaming an upload body (64 KiB).
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Maximum length of a sanitized filename, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

// =============================================================================
// FILTERING
// =============================================================================

/// Number of documents shown in the "recent" section.
pub const RECENT_LIMIT: usize = 6;

/// Width of the "this week" window, counted back from local start of day.
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Width of the "this month" window, counted back from local start of day.
pub const MONTH_WINDOW_DAYS: i64 = 30;

// =============================================================================
// STORE
// =============================================================================

/// Default hosted backend URL.
pub const STORE_URL: &str = "http://127.0.0.1:54321";

/// Default object storage bucket for uploaded files.
pub const STORE_BUCKET: &str = "documents";

/// Default table holding document records.
pub const STORE_TABLE: &str = "documents";

/// Request timeout for store calls (seconds).
pub const STORE_TIMEOUT_SECS: u64 = 30;

/// Timeout for the liveness probe (seconds).
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Lifetime of signed download/preview URLs (seconds).
pub const SIGNED_URL_TTL_SECS: u64 = 3600;

// =============================================================================
// PREVIEW
// =============================================================================

/// Smallest PDF zoom factor.
pub const PDF_ZOOM_MIN: f32 = 0.5;

/// Largest PDF zoom factor.
pub const PDF_ZOOM_MAX: f32 = 3.0;

/// Zoom increment per zoom-in/zoom-out step.
pub const PDF_ZOOM_STEP: f32 = 0.25;
