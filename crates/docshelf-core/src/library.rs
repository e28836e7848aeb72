//! Library controller.
//!
//! Owns the client-side copy of the document collection, the filter state,
//! the derived filter-panel collections and the preview session. Store
//! mutations are applied locally only after the store confirms them.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeZone};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collections::{available_categories, available_tags};
use crate::defaults::{MAX_UPLOAD_BYTES, RECENT_LIMIT};
use crate::error::{Error, Result};
use crate::filter::CategoryChoice;
use crate::models::Document;
use crate::preview::PreviewSession;
use crate::state::FilterState;
use crate::traits::{CreateArticleRequest, DocumentStore, UploadFileRequest};
use crate::upload::{validate_article, validate_upload, UploadProgress};

/// Reachability of the store as last observed. `Disconnected` drives the
/// persistent banner with its manual retry action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Connected,
    Disconnected(String),
}

/// Per-section document counts for navigation badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionCounts {
    pub files: usize,
    pub articles: usize,
    pub favorites: usize,
    pub recent: usize,
}

pub struct Library {
    store: Arc<dyn DocumentStore>,
    documents: Vec<Document>,
    categories: Vec<CategoryChoice>,
    tags: Vec<String>,
    filters: FilterState,
    status: ConnectionStatus,
    preview: PreviewSession,
    max_upload_bytes: u64,
}

impl Library {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            documents: Vec::new(),
            categories: available_categories(&[]),
            tags: Vec::new(),
            filters: FilterState::default(),
            status: ConnectionStatus::Unknown,
            preview: PreviewSession::new(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Override the upload ceiling checked before the store is called.
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.filters
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn preview(&self) -> &PreviewSession {
        &self.preview
    }

    pub fn available_categories(&self) -> &[CategoryChoice] {
        &self.categories
    }

    pub fn available_tags(&self) -> &[String] {
        &self.tags
    }

    /// Documents visible under the current filter state.
    pub fn visible(&self) -> Vec<&Document> {
        self.filters.apply(&self.documents)
    }

    pub fn visible_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<&Document> {
        self.filters.apply_at(&self.documents, now)
    }

    pub fn counts(&self) -> SectionCounts {
        SectionCounts {
            files: self.documents.len(),
            articles: self.documents.iter().filter(|d| d.is_article()).count(),
            favorites: self.documents.iter().filter(|d| d.favorite).count(),
            recent: self.documents.len().min(RECENT_LIMIT),
        }
    }

    fn recompute(&mut self) {
        self.categories = available_categories(&self.documents);
        self.tags = available_tags(&self.documents);
    }

    /// Reload the collection from the store. On failure the previous
    /// collection is kept and the status flips to `Disconnected`.
    pub async fn refresh(&mut self) -> Result<()> {
        let start = Instant::now();
        match self.store.list().await {
            Ok(documents) => {
                self.documents = documents;
                self.recompute();
                self.status = ConnectionStatus::Connected;
                debug!(
                    result_count = self.documents.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Library refreshed"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Library refresh failed");
                self.status = ConnectionStatus::Disconnected(e.to_string());
                Err(e)
            }
        }
    }

    /// Manual retry behind the connection banner: probe, then reload.
    pub async fn retry(&mut self) -> Result<()> {
        if !self.store.check_connection().await {
            let msg = "Document store is unreachable".to_string();
            self.status = ConnectionStatus::Disconnected(msg.clone());
            return Err(Error::Connection(msg));
        }
        self.refresh().await
    }

    /// Flip a document's favorite flag once the store confirms it.
    pub async fn toggle_favorite(&mut self, id: Uuid) -> Result<bool> {
        let current = self
            .document(id)
            .map(|d| d.favorite)
            .ok_or(Error::DocumentNotFound(id))?;

        if let Err(e) = self.store.set_favorite(id, !current).await {
            warn!(document_id = %id, error = %e, "Favorite toggle failed; state unchanged");
            return Err(e);
        }

        if let Some(doc) = self.documents.iter_mut().find(|d| d.id == id) {
            doc.favorite = !current;
        }
        self.recompute();
        Ok(!current)
    }

    /// Delete a document once the store confirms it. Closes the preview if
    /// it was showing this document.
    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        if self.document(id).is_none() {
            return Err(Error::DocumentNotFound(id));
        }

        if let Err(e) = self.store.delete(id).await {
            warn!(document_id = %id, error = %e, "Delete failed; state unchanged");
            return Err(e);
        }

        self.documents.retain(|d| d.id != id);
        self.recompute();
        if self.preview.state().document_id() == Some(id) {
            self.preview.close();
        }
        info!(document_id = %id, "Document deleted");
        Ok(())
    }

    /// Create an article. Missing title or content is rejected before the
    /// store is called.
    pub async fn create_article(&mut self, req: CreateArticleRequest) -> Result<&Document> {
        validate_article(&req.title, &req.content)?;
        let doc = self.store.create_article(req).await?;
        info!(document_id = %doc.id, "Article created");
        Ok(self.insert_front(doc))
    }

    /// Upload a file. Missing fields and oversized files are rejected before
    /// the store is called.
    pub async fn upload(
        &mut self,
        req: UploadFileRequest,
        progress: UploadProgress,
    ) -> Result<&Document> {
        validate_upload(&req.title, &req.filename, req.size(), self.max_upload_bytes)?;
        let doc = self.store.upload_file(req, progress).await?;
        info!(
            document_id = %doc.id,
            document_type = %doc.doc_type,
            "File uploaded"
        );
        Ok(self.insert_front(doc))
    }

    fn insert_front(&mut self, doc: Document) -> &Document {
        self.documents.insert(0, doc);
        self.recompute();
        &self.documents[0]
    }

    /// Open the preview for a document and load its payload. Returns false
    /// when a newer open or a close superseded this one before it finished.
    pub async fn open_preview(&self, id: Uuid) -> Result<bool> {
        let doc = self.document(id).ok_or(Error::DocumentNotFound(id))?;
        Ok(self.preview.load(self.store.as_ref(), doc).await)
    }

    pub fn close_preview(&self) {
        self.preview.close();
    }
}
