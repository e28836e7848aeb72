//! Upload and article preparation shared by every store implementation.
//!
//! Everything here runs before any bytes leave the process: required-field
//! checks, the size ceiling, content-type detection, type and colour
//! inference, and storage path construction.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::defaults::MAX_FILENAME_BYTES;
use crate::error::{Error, Result};
use crate::models::DocumentType;
use crate::traits::UploadFileRequest;

/// Extension to MIME table for formats without magic bytes, plus the image
/// and document formats a preview may need to label.
static EXTENSION_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("txt", "text/plain"),
        ("text", "text/plain"),
        ("log", "text/plain"),
        ("csv", "text/csv"),
        ("json", "application/json"),
        ("md", "text/markdown"),
        ("markdown", "text/markdown"),
        ("html", "text/html"),
        ("htm", "text/html"),
        ("pdf", "application/pdf"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("odt", "application/vnd.oasis.opendocument.text"),
        ("rtf", "application/rtf"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("bmp", "image/bmp"),
        ("svg", "image/svg+xml"),
    ]
    .into_iter()
    .collect()
});

/// Claimed types that say nothing about the content.
const GENERIC_MIME: &[&str] = &["", "application/octet-stream", "binary/octet-stream"];

/// Lower-cased extension of a filename or storage path, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type implied by a filename's extension, if known.
pub fn mime_from_extension(name: &str) -> Option<&'static str> {
    extension_of(name).and_then(|ext| EXTENSION_MIME.get(ext.as_str()).copied())
}

/// Work out the content type of an upload.
///
/// Order: magic bytes, then the caller's claimed type unless it is generic,
/// then the filename extension, then `application/octet-stream`.
pub fn detect_content_type(filename: &str, data: &[u8], claimed: Option<&str>) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some(claimed) = claimed.map(str::trim) {
        if !GENERIC_MIME.contains(&claimed.to_ascii_lowercase().as_str()) {
            return claimed.to_string();
        }
    }

    mime_from_extension(filename)
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Document type for an upload: from the MIME type, falling back to the
/// filename extension when the MIME type is not one of the known kinds.
pub fn infer_document_type(content_type: &str, filename: &str) -> DocumentType {
    match DocumentType::from_mime(content_type) {
        DocumentType::Other => extension_of(filename)
            .map(|ext| DocumentType::from_extension(&ext))
            .unwrap_or(DocumentType::Other),
        t => t,
    }
}

/// Caller-supplied colour when present and non-blank, else the type default.
pub fn resolve_background_color(requested: Option<&str>, doc_type: DocumentType) -> String {
    requested
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(doc_type.default_color())
        .to_string()
}

/// Trim tags, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// Trim a category; blank becomes `None`.
pub fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Required-field checks for a new article.
pub fn validate_article(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    if content.trim().is_empty() {
        return Err(Error::Validation("Content is required".to_string()));
    }
    Ok(())
}

/// Required-field and size checks for a new upload.
pub fn validate_upload(title: &str, filename: &str, size: u64, max_bytes: u64) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    if filename.trim().is_empty() || size == 0 {
        return Err(Error::Validation("A non-empty file is required".to_string()));
    }
    if size > max_bytes {
        return Err(Error::SizeLimit {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Sanitize a filename for use inside a storage path.
///
/// Drops directory components, replaces characters object stores and
/// browsers choke on, and truncates on a char boundary keeping the extension.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '#' | '%' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim().trim_start_matches('.');
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }
    if sanitized.len() <= MAX_FILENAME_BYTES {
        return sanitized.to_string();
    }

    let ext = sanitized
        .rfind('.')
        .map(|pos| &sanitized[pos..])
        .filter(|ext| ext.len() < 16)
        .unwrap_or("");
    let mut cut = MAX_FILENAME_BYTES - ext.len();
    while !sanitized.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &sanitized[..cut], ext)
}

/// Object storage path for a document's file: `{id}/{sanitized filename}`.
pub fn storage_path_for(id: Uuid, filename: &str) -> String {
    format!("{}/{}", id, sanitize_filename(filename))
}

/// Everything a store needs to write for an upload, derived from the
/// request once it has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub id: Uuid,
    pub storage_path: String,
    pub content_type: String,
    pub doc_type: DocumentType,
    pub background_color: String,
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl PreparedUpload {
    pub fn new(req: &UploadFileRequest, max_bytes: u64) -> Result<Self> {
        validate_upload(&req.title, &req.filename, req.size(), max_bytes)?;

        let content_type = detect_content_type(&req.filename, &req.data, req.content_type.as_deref());
        let doc_type = infer_document_type(&content_type, &req.filename);
        let id = Uuid::now_v7();

        Ok(Self {
            id,
            storage_path: storage_path_for(id, &req.filename),
            background_color: resolve_background_color(req.background_color.as_deref(), doc_type),
            content_type,
            doc_type,
            title: req.title.trim().to_string(),
            category: normalize_category(req.category.as_deref()),
            tags: normalize_tags(&req.tags),
        })
    }
}

// =============================================================================
// PROGRESS REPORTING
// =============================================================================

/// Upload progress sink.
///
/// Reports whole percentages in 0..=100. Values are clamped and never go
/// backwards; repeated values are suppressed.
#[derive(Clone)]
pub struct UploadProgress {
    callback: Option<Arc<dyn Fn(u8) + Send + Sync>>,
    // highest reported percentage plus one; zero until the first report
    high_water: Arc<AtomicU8>,
}

impl UploadProgress {
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
            high_water: Arc::new(AtomicU8::new(0)),
        }
    }

    /// A reporter that discards every update.
    pub fn noop() -> Self {
        Self {
            callback: None,
            high_water: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.high_water.fetch_max(percent + 1, Ordering::SeqCst);
        if percent < previous {
            return;
        }
        if let Some(cb) = &self.callback {
            cb(percent);
        }
    }

    /// Report `sent` out of `total` bytes.
    pub fn report_bytes(&self, sent: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            (sent.min(total) * 100 / total) as u8
        };
        self.report(percent);
    }

    /// Highest percentage reported so far.
    pub fn last(&self) -> u8 {
        self.high_water.load(Ordering::SeqCst).saturating_sub(1)
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgress")
            .field("has_callback", &self.callback.is_some())
            .field("last", &self.last())
            .finish()
    }
}
