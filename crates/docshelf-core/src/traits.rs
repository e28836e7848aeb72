//! Document store abstraction.
//!
//! Persistence, authentication and blob storage belong to an external
//! backend. [`DocumentStore`] is the whole contract the rest of the crate
//! relies on; concrete implementations live in `docshelf-store`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Document;
use crate::upload::UploadProgress;

/// Request for creating a new article.
#[derive(Debug, Clone, Default)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Overrides the type default colour when set
    pub background_color: Option<String>,
}

/// Request for uploading a file.
#[derive(Debug, Clone, Default)]
pub struct UploadFileRequest {
    pub data: Vec<u8>,
    pub filename: String,
    pub title: String,
    /// MIME type reported by the caller, if any
    pub content_type: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Overrides the type default colour when set
    pub background_color: Option<String>,
}

impl UploadFileRequest {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Where a preview's bytes can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSource {
    pub url: String,
    pub content_type: String,
}

/// Remote document persistence and blob storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document, newest `date_added` first.
    async fn list(&self) -> Result<Vec<Document>>;

    /// Set the favorite flag of a document.
    async fn set_favorite(&self, id: Uuid, favorite: bool) -> Result<()>;

    /// Delete a document record. Any stored blob is removed best-effort;
    /// failing to remove it does not fail the delete.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Create an article with inline content.
    async fn create_article(&self, req: CreateArticleRequest) -> Result<Document>;

    /// Upload a file and create its record.
    ///
    /// Files above the size ceiling are rejected before any transfer. If the
    /// record cannot be created after the blob was stored, the blob is
    /// removed best-effort before the error is returned.
    async fn upload_file(&self, req: UploadFileRequest, progress: UploadProgress)
        -> Result<Document>;

    /// Inline content of an article.
    async fn get_article_content(&self, id: Uuid) -> Result<String>;

    /// Time-limited URL for downloading a document's blob.
    async fn resolve_download_url(&self, id: Uuid) -> Result<String>;

    /// URL and content type for previewing a document's blob.
    async fn preview(&self, id: Uuid) -> Result<PreviewSource>;

    /// Fetch a text payload from a URL previously issued by this store.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Non-mutating liveness probe.
    async fn check_connection(&self) -> bool;
}
