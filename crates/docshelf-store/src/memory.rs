//! In-memory document store for tests and offline use.
//!
//! Behaves like the hosted backend (newest-first listing, blob cleanup,
//! signed-looking URLs) and adds knobs for simulating failures:
//! going offline, failing the next record insert, failing blob removal and
//! per-document latency.
//!
//! ```rust,ignore
//! let store = MemoryDocumentStore::new().with_documents(seed);
//! store.fail_next_insert();
//! let err = store.upload_file(req, UploadProgress::noop()).await.unwrap_err();
//! assert_eq!(store.blob_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use docshelf_core::defaults::{MAX_UPLOAD_BYTES, UPLOAD_CHUNK_BYTES};
use docshelf_core::upload::{
    mime_from_extension, normalize_category, normalize_tags, resolve_background_color,
    validate_article,
};
use docshelf_core::{
    CreateArticleRequest, Document, DocumentStore, DocumentType, Error, PreparedUpload,
    PreviewSource, Result, UploadFileRequest, UploadProgress,
};

/// URL scheme for blobs served by this store.
pub const MEMORY_URL_PREFIX: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct Inner {
    /// Newest `date_added` first.
    documents: Vec<Document>,
    blobs: HashMap<String, StoredBlob>,
    last_added: Option<DateTime<Utc>>,
    latency: HashMap<Uuid, Duration>,
    call_log: Vec<&'static str>,
}

/// [`DocumentStore`] held entirely in memory.
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
    online: AtomicBool,
    fail_next_insert: AtomicBool,
    fail_blob_removal: AtomicBool,
    max_upload_bytes: u64,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            online: AtomicBool::new(true),
            fail_next_insert: AtomicBool::new(false),
            fail_blob_removal: AtomicBool::new(false),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Seed the store with existing records.
    pub fn with_documents(self, documents: impl IntoIterator<Item = Document>) -> Self {
        {
            let mut inner = self.lock();
            inner.documents.extend(documents);
            inner.documents.sort_by(|a, b| b.date_added.cmp(&a.date_added));
            inner.last_added = inner.documents.first().map(|d| d.date_added);
        }
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Store a blob directly, as if uploaded earlier.
    pub fn put_blob(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        let content_type = mime_from_extension(&path)
            .unwrap_or("application/octet-stream")
            .to_string();
        self.lock().blobs.insert(
            path,
            StoredBlob {
                data: data.into(),
                content_type,
            },
        );
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make the next record insert fail after any blob was stored.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Make blob removal fail until switched off again.
    pub fn set_blob_removal_fails(&self, fails: bool) {
        self.fail_blob_removal.store(fails, Ordering::SeqCst);
    }

    /// Delay payload reads for one document.
    pub fn set_latency(&self, id: Uuid, latency: Duration) {
        self.lock().latency.insert(id, latency);
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(path).map(|b| b.data.clone())
    }

    pub fn blob_count(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    /// Operations that reached the store, oldest first.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().call_log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and fail if offline.
    fn enter(&self, op: &'static str) -> Result<()> {
        self.lock().call_log.push(op);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Connection("Document store is offline".to_string()))
        }
    }

    async fn delay(&self, id: Uuid) {
        let latency = self.lock().latency.get(&id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn find(&self, id: Uuid) -> Result<Document> {
        self.lock()
            .documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(Error::DocumentNotFound(id))
    }

    fn stored_path(doc: &Document) -> Result<String> {
        doc.storage_path()
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("No stored file for document {}", doc.id)))
    }

    /// Insert a record with a strictly increasing `date_added`.
    fn insert(&self, mut doc: Document) -> Result<Document> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection("Insert rejected".to_string()));
        }
        let mut inner = self.lock();
        let now = Utc::now();
        doc.date_added = match inner.last_added {
            Some(last) if now <= last => last + chrono::Duration::milliseconds(1),
            _ => now,
        };
        inner.last_added = Some(doc.date_added);
        inner.documents.insert(0, doc.clone());
        Ok(doc)
    }

    fn remove_blob_best_effort(&self, path: &str) {
        if self.fail_blob_removal.load(Ordering::SeqCst) {
            warn!(storage_path = %path, "Failed to remove stored file");
            return;
        }
        self.lock().blobs.remove(path);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self) -> Result<Vec<Document>> {
        self.enter("list")?;
        Ok(self.lock().documents.clone())
    }

    async fn set_favorite(&self, id: Uuid, favorite: bool) -> Result<()> {
        self.enter("set_favorite")?;
        let mut inner = self.lock();
        let doc = inner
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(Error::DocumentNotFound(id))?;
        doc.favorite = favorite;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.enter("delete")?;
        let removed = {
            let mut inner = self.lock();
            let pos = inner
                .documents
                .iter()
                .position(|d| d.id == id)
                .ok_or(Error::DocumentNotFound(id))?;
            inner.documents.remove(pos)
        };
        if let Some(path) = removed.storage_path() {
            self.remove_blob_best_effort(path);
        }
        debug!(document_id = %id, "Deleted document");
        Ok(())
    }

    async fn create_article(&self, req: CreateArticleRequest) -> Result<Document> {
        self.enter("create_article")?;
        validate_article(&req.title, &req.content)?;

        let doc = Document {
            id: Uuid::now_v7(),
            title: req.title.trim().to_string(),
            doc_type: DocumentType::Article,
            tags: normalize_tags(&req.tags),
            date_added: Utc::now(),
            favorite: false,
            category: normalize_category(req.category.as_deref()),
            background_color: resolve_background_color(
                req.background_color.as_deref(),
                DocumentType::Article,
            ),
            content: Some(req.content),
            storage_path: None,
        };
        self.insert(doc)
    }

    async fn upload_file(
        &self,
        req: UploadFileRequest,
        progress: UploadProgress,
    ) -> Result<Document> {
        self.enter("upload_file")?;
        let prepared = PreparedUpload::new(&req, self.max_upload_bytes)?;

        let total = req.size();
        progress.report(0);
        let mut sent = 0u64;
        while sent < total {
            sent = (sent + UPLOAD_CHUNK_BYTES as u64).min(total);
            progress.report((sent * 90 / total) as u8);
        }
        self.lock().blobs.insert(
            prepared.storage_path.clone(),
            StoredBlob {
                data: req.data,
                content_type: prepared.content_type.clone(),
            },
        );

        let doc = Document {
            id: prepared.id,
            title: prepared.title,
            doc_type: prepared.doc_type,
            tags: prepared.tags,
            date_added: Utc::now(),
            favorite: false,
            category: prepared.category,
            background_color: prepared.background_color,
            content: None,
            storage_path: Some(prepared.storage_path.clone()),
        };

        match self.insert(doc) {
            Ok(doc) => {
                progress.report(100);
                Ok(doc)
            }
            Err(e) => {
                warn!(
                    storage_path = %prepared.storage_path,
                    error = %e,
                    "Record insert failed after upload; removing stored file"
                );
                self.remove_blob_best_effort(&prepared.storage_path);
                Err(e)
            }
        }
    }

    async fn get_article_content(&self, id: Uuid) -> Result<String> {
        self.enter("get_article_content")?;
        self.delay(id).await;
        Ok(self.find(id)?.content.unwrap_or_default())
    }

    async fn resolve_download_url(&self, id: Uuid) -> Result<String> {
        self.enter("resolve_download_url")?;
        self.delay(id).await;
        let path = Self::stored_path(&self.find(id)?)?;
        Ok(format!("{}{}?download", MEMORY_URL_PREFIX, path))
    }

    async fn preview(&self, id: Uuid) -> Result<PreviewSource> {
        self.enter("preview")?;
        self.delay(id).await;
        let doc = self.find(id)?;
        let path = Self::stored_path(&doc)?;
        let content_type = self
            .lock()
            .blobs
            .get(&path)
            .map(|b| b.content_type.clone())
            .unwrap_or_else(|| doc.doc_type.mime_type().to_string());
        Ok(PreviewSource {
            url: format!("{}{}", MEMORY_URL_PREFIX, path),
            content_type,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.enter("fetch_text")?;
        let path = url
            .strip_prefix(MEMORY_URL_PREFIX)
            .ok_or_else(|| Error::NotFound(format!("Not a stored file URL: {}", url)))?;
        let data = self
            .blob(path)
            .ok_or_else(|| Error::NotFound(format!("No stored file at {}", path)))?;
        String::from_utf8(data)
            .map_err(|e| Error::Serialization(format!("Stored file is not UTF-8: {}", e)))
    }

    async fn check_connection(&self) -> bool {
        self.lock().call_log.push("check_connection");
        self.online.load(Ordering::SeqCst)
    }
}
