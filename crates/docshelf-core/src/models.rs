//! Core data models for docshelf.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// =============================================================================
// BACKGROUND COLOURS
// =============================================================================

/// Red tint used for PDF documents.
pub const COLOR_PDF: &str = "#fee2e2";
/// Green tint used for word-processor documents.
pub const COLOR_DOC: &str = "#dcfce7";
/// Yellow tint used for images.
pub const COLOR_IMAGE: &str = "#fef9c3";
/// Light blue tint used for markdown files.
pub const COLOR_MARKDOWN: &str = "#e0f2fe";
/// Purple tint used for plain text and JSON files.
pub const COLOR_TEXT: &str = "#f3e8ff";
/// Blue tint used for everything else, articles included.
pub const COLOR_DEFAULT: &str = "#dbeafe";

// =============================================================================
// DOCUMENT TYPE
// =============================================================================

/// Closed set of document kinds.
///
/// Values the store sends that are not in this set deserialize to
/// [`DocumentType::Other`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Doc,
    Article,
    Image,
    Markdown,
    Text,
    #[serde(other)]
    Other,
}

impl DocumentType {
    /// Every variant, in display order.
    pub const ALL: [DocumentType; 7] = [
        Self::Pdf,
        Self::Doc,
        Self::Article,
        Self::Image,
        Self::Markdown,
        Self::Text,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Article => "article",
            Self::Image => "image",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Other => "other",
        }
    }

    /// Background colour assigned at creation when the caller supplies none.
    pub fn default_color(&self) -> &'static str {
        match self {
            Self::Pdf => COLOR_PDF,
            Self::Doc => COLOR_DOC,
            Self::Image => COLOR_IMAGE,
            Self::Markdown => COLOR_MARKDOWN,
            Self::Text => COLOR_TEXT,
            Self::Article | Self::Other => COLOR_DEFAULT,
        }
    }

    /// Infer the document type from a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Self::Pdf,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/vnd.oasis.opendocument.text"
            | "application/rtf" => Self::Doc,
            "text/markdown" | "text/x-markdown" => Self::Markdown,
            "text/plain" | "application/json" => Self::Text,
            m if m.starts_with("image/") => Self::Image,
            _ => Self::Other,
        }
    }

    /// Infer the document type from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" | "odt" | "rtf" => Self::Doc,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" => Self::Image,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" | "log" | "json" => Self::Text,
            _ => Self::Other,
        }
    }

    /// Canonical MIME type used when the storage path carries no usable extension.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Article => "text/plain",
            Self::Image => "image/*",
            Self::Markdown => "text/markdown",
            Self::Text => "text/plain",
            Self::Other => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "doc" => Ok(Self::Doc),
            "article" => Ok(Self::Article),
            "image" => Ok(Self::Image),
            "markdown" => Ok(Self::Markdown),
            "text" => Ok(Self::Text),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid document type: {}", s)),
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// A user-owned record: either an authored article or an uploaded file.
///
/// Articles carry inline `content`; uploads carry a `storage_path` into the
/// object store. Only `favorite` is ever mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Document {
    /// Category name, or `None` when the document is uncategorized.
    pub fn category_name(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category_name().is_none()
    }

    /// Storage path, or `None` for articles and records without a blob.
    pub fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn is_article(&self) -> bool {
        self.doc_type == DocumentType::Article
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Case-insensitive match of an already lower-cased needle against the
    /// title, every tag, and the category.
    pub fn matches_query(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(needle_lower))
            || self
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle_lower))
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Coarse view filter applied before search and option filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Files,
    Articles,
    Favorites,
    Recent,
}

impl Section {
    pub const ALL: [Section; 4] = [Self::Files, Self::Articles, Self::Favorites, Self::Recent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Articles => "articles",
            Self::Favorites => "favorites",
            Self::Recent => "recent",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "files" => Ok(Self::Files),
            "articles" => Ok(Self::Articles),
            "favorites" => Ok(Self::Favorites),
            "recent" => Ok(Self::Recent),
            _ => Err(format!("Invalid section: {}", s)),
        }
    }
}
