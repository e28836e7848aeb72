//! Hosted backend: REST-over-Postgres for document records and an object
//! storage API for uploaded files.
//!
//! Records live in `{base}/rest/v1/{table}`, blobs under
//! `{base}/storage/v1/object/{bucket}/{path}`. Every request carries the
//! configured key both as `apikey` and as a bearer token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use docshelf_core::defaults::{HEALTH_CHECK_TIMEOUT_SECS, UPLOAD_CHUNK_BYTES};
use docshelf_core::upload::{
    mime_from_extension, normalize_category, normalize_tags, resolve_background_color,
    validate_article,
};
use docshelf_core::{
    CreateArticleRequest, Document, DocumentStore, DocumentType, Error, PreparedUpload,
    PreviewSource, Result, UploadFileRequest, UploadProgress,
};

use crate::config::StoreConfig;

/// Share of the progress bar covered by the byte transfer; the rest is the
/// record insert.
const TRANSFER_PERCENT: u64 = 90;

/// Row shape written on insert.
#[derive(Debug, Serialize)]
struct NewDocumentRow<'a> {
    id: Uuid,
    title: &'a str,
    #[serde(rename = "type")]
    doc_type: DocumentType,
    tags: &'a [String],
    date_added: DateTime<Utc>,
    favorite: bool,
    category: Option<&'a str>,
    background_color: &'a str,
    content: Option<&'a str>,
    storage_path: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ContentRow {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// [`DocumentStore`] backed by a hosted database and object storage.
pub struct RemoteDocumentStore {
    client: Client,
    config: StoreConfig,
}

impl RemoteDocumentStore {
    /// Create a store from a validated configuration.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Create a store from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(StoreConfig::load()?)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.base(), self.config.table)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base(),
            self.config.bucket,
            encode_path(path)
        )
    }

    fn sign_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.config.base(),
            self.config.bucket,
            encode_path(path)
        )
    }

    /// Fetch the full record for `id`.
    async fn fetch_row(&self, id: Uuid) -> Result<Document> {
        let response = self
            .request(Method::GET, self.table_url())
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .send()
            .await?;
        let rows: Vec<Document> = ensure_found(response, "Fetch document").await?.json().await?;
        rows.into_iter().next().ok_or(Error::DocumentNotFound(id))
    }

    async fn insert_row(&self, row: &NewDocumentRow<'_>) -> Result<Document> {
        let response = self
            .request(Method::POST, self.table_url())
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let rows: Vec<Document> = ensure_success(response, "Insert document").await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Internal("Insert returned no row".to_string()))
    }

    /// Stream `data` to object storage, reporting progress per chunk.
    async fn put_object(
        &self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: &UploadProgress,
    ) -> Result<()> {
        let bytes = Bytes::from(data);
        let total = bytes.len() as u64;
        let reporter = progress.clone();
        let chunks = (0..bytes.len())
            .step_by(UPLOAD_CHUNK_BYTES)
            .map(move |start| {
                let end = (start + UPLOAD_CHUNK_BYTES).min(bytes.len());
                reporter.report((end as u64 * TRANSFER_PERCENT / total.max(1)) as u8);
                Ok::<Bytes, std::io::Error>(bytes.slice(start..end))
            });
        let body = reqwest::Body::wrap_stream(futures::stream::iter(chunks));

        let response = self
            .request(Method::POST, self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .header("x-upsert", "false")
            .body(body)
            .send()
            .await?;
        ensure_success(response, "Upload file").await?;
        Ok(())
    }

    async fn remove_object(&self, path: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, self.object_url(path))
            .send()
            .await?;
        ensure_found(response, "Remove file").await?;
        Ok(())
    }

    /// Remove a blob, logging instead of failing.
    async fn remove_object_best_effort(&self, path: &str) {
        if let Err(e) = self.remove_object(path).await {
            warn!(storage_path = %path, error = %e, "Failed to remove stored file");
        }
    }

    /// Absolute signed URL for a stored object.
    async fn signed_url(&self, path: &str) -> Result<String> {
        let response = self
            .request(Method::POST, self.sign_url(path))
            .json(&SignRequest {
                expires_in: self.config.signed_url_ttl_secs,
            })
            .send()
            .await?;
        let signed: SignResponse = ensure_found(response, "Sign URL").await?.json().await?;

        if signed.signed_url.starts_with("http://") || signed.signed_url.starts_with("https://") {
            Ok(signed.signed_url)
        } else {
            Ok(format!(
                "{}/storage/v1{}",
                self.config.base(),
                signed.signed_url
            ))
        }
    }

    fn stored_path(doc: &Document) -> Result<&str> {
        doc.storage_path()
            .ok_or_else(|| Error::NotFound(format!("No stored file for document {}", doc.id)))
    }
}

/// Map non-2xx responses to `Connection` errors carrying the status and
/// response body.
async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    check_status(response, context, false).await
}

/// Like [`ensure_success`], for calls scoped to one record or blob: a 404
/// means that record or blob is gone and becomes `NotFound`.
async fn ensure_found(response: Response, context: &str) -> Result<Response> {
    check_status(response, context, true).await
}

async fn check_status(response: Response, context: &str, scoped: bool) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if scoped && status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("{}: {}", context, body)));
    }
    Err(Error::Connection(format!(
        "{} failed: HTTP {}: {}",
        context, status, body
    )))
}

/// Percent-encode each segment of a storage path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Append the `download` query parameter that makes object storage serve
/// the file as an attachment named `filename`.
fn with_download_param(url: &str, filename: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}download={}", url, sep, urlencoding::encode(filename))
}

#[async_trait]
impl DocumentStore for RemoteDocumentStore {
    #[instrument(skip(self), fields(subsystem = "store", component = "remote", op = "list"))]
    async fn list(&self) -> Result<Vec<Document>> {
        let start = Instant::now();
        let response = self
            .request(Method::GET, self.table_url())
            .query(&[("select", "*"), ("order", "date_added.desc")])
            .send()
            .await?;
        let documents: Vec<Document> = ensure_success(response, "List documents").await?.json().await?;
        debug!(
            result_count = documents.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed documents"
        );
        Ok(documents)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "remote", op = "set_favorite"))]
    async fn set_favorite(&self, id: Uuid, favorite: bool) -> Result<()> {
        let response = self
            .request(Method::PATCH, self.table_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "favorite": favorite }))
            .send()
            .await?;
        let rows: Vec<Document> = ensure_success(response, "Update favorite").await?.json().await?;
        if rows.is_empty() {
            return Err(Error::DocumentNotFound(id));
        }
        debug!(document_id = %id, favorite, "Favorite updated");
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "remote", op = "delete"))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let doc = self.fetch_row(id).await?;

        let response = self
            .request(Method::DELETE, self.table_url())
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        ensure_success(response, "Delete document").await?;

        if let Some(path) = doc.storage_path() {
            self.remove_object_best_effort(path).await;
        }
        info!(document_id = %id, "Deleted document");
        Ok(())
    }

    #[instrument(skip(self, req), fields(subsystem = "store", component = "remote", op = "create_article"))]
    async fn create_article(&self, req: CreateArticleRequest) -> Result<Document> {
        validate_article(&req.title, &req.content)?;

        let tags = normalize_tags(&req.tags);
        let category = normalize_category(req.category.as_deref());
        let color = resolve_background_color(req.background_color.as_deref(), DocumentType::Article);
        let row = NewDocumentRow {
            id: Uuid::now_v7(),
            title: req.title.trim(),
            doc_type: DocumentType::Article,
            tags: &tags,
            date_added: Utc::now(),
            favorite: false,
            category: category.as_deref(),
            background_color: &color,
            content: Some(&req.content),
            storage_path: None,
        };

        let doc = self.insert_row(&row).await?;
        info!(document_id = %doc.id, "Created article");
        Ok(doc)
    }

    #[instrument(skip(self, req, progress), fields(subsystem = "store", component = "remote", op = "upload_file", bytes = req.data.len()))]
    async fn upload_file(
        &self,
        req: UploadFileRequest,
        progress: UploadProgress,
    ) -> Result<Document> {
        let prepared = PreparedUpload::new(&req, self.config.max_upload_bytes)?;
        let start = Instant::now();
        progress.report(0);

        if let Err(e) = self
            .put_object(&prepared.storage_path, &prepared.content_type, req.data, &progress)
            .await
        {
            // A failed transfer may still leave a partial object behind.
            self.remove_object_best_effort(&prepared.storage_path).await;
            return Err(e);
        }

        let row = NewDocumentRow {
            id: prepared.id,
            title: &prepared.title,
            doc_type: prepared.doc_type,
            tags: &prepared.tags,
            date_added: Utc::now(),
            favorite: false,
            category: prepared.category.as_deref(),
            background_color: &prepared.background_color,
            content: None,
            storage_path: Some(&prepared.storage_path),
        };

        match self.insert_row(&row).await {
            Ok(doc) => {
                progress.report(100);
                info!(
                    document_id = %doc.id,
                    storage_path = %prepared.storage_path,
                    content_type = %prepared.content_type,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Uploaded file"
                );
                Ok(doc)
            }
            Err(e) => {
                warn!(
                    storage_path = %prepared.storage_path,
                    error = %e,
                    "Record insert failed after upload; removing stored file"
                );
                self.remove_object_best_effort(&prepared.storage_path).await;
                Err(e)
            }
        }
    }

    async fn get_article_content(&self, id: Uuid) -> Result<String> {
        let response = self
            .request(Method::GET, self.table_url())
            .query(&[("id", format!("eq.{}", id)), ("select", "content".to_string())])
            .send()
            .await?;
        let rows: Vec<ContentRow> = ensure_found(response, "Fetch article").await?.json().await?;
        let row = rows.into_iter().next().ok_or(Error::DocumentNotFound(id))?;
        Ok(row.content.unwrap_or_default())
    }

    async fn resolve_download_url(&self, id: Uuid) -> Result<String> {
        let doc = self.fetch_row(id).await?;
        let path = Self::stored_path(&doc)?;
        let url = self.signed_url(path).await?;
        let filename = path.rsplit('/').next().unwrap_or(path);
        Ok(with_download_param(&url, filename))
    }

    async fn preview(&self, id: Uuid) -> Result<PreviewSource> {
        let doc = self.fetch_row(id).await?;
        let path = Self::stored_path(&doc)?;
        let url = self.signed_url(path).await?;
        let content_type = mime_from_extension(path)
            .unwrap_or(doc.doc_type.mime_type())
            .to_string();
        debug!(document_id = %id, content_type = %content_type, "Resolved preview source");
        Ok(PreviewSource { url, content_type })
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let text = ensure_found(response, "Fetch text").await?.text().await?;
        Ok(text)
    }

    async fn check_connection(&self) -> bool {
        let response = self
            .request(Method::GET, self.table_url())
            .query(&[("select", "id"), ("limit", "1")])
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!("Document store health check passed");
                true
            }
            Ok(resp) => {
                warn!("Document store health check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Document store health check error: {}", e);
                false
            }
        }
    }
}
