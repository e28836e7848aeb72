//! Document preview resolution.
//!
//! Classification ([`classify`]) is decided from the document type and
//! storage path alone. Fetching the payload is a separate async step
//! ([`resolve_payload`]), and [`PreviewSession`] makes sure a slow fetch for
//! a document the user already navigated away from never overwrites what is
//! currently shown.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::defaults::{PDF_ZOOM_MAX, PDF_ZOOM_MIN, PDF_ZOOM_STEP};
use crate::error::{Error, Result};
use crate::models::{Document, DocumentType};
use crate::traits::DocumentStore;
use crate::upload::extension_of;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// How a document is rendered in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    InlineText,
    Markdown,
    PlainText,
    Image,
    Pdf,
    Unsupported,
}

impl RenderMode {
    /// Mode implied by the document type alone.
    pub fn for_type(doc_type: DocumentType) -> Self {
        match doc_type {
            DocumentType::Article => Self::InlineText,
            DocumentType::Markdown => Self::Markdown,
            DocumentType::Text => Self::PlainText,
            DocumentType::Image => Self::Image,
            DocumentType::Pdf => Self::Pdf,
            DocumentType::Doc | DocumentType::Other => Self::Unsupported,
        }
    }

    /// Mode implied by a storage path extension, for the text formats only.
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "md" | "markdown" => Some(Self::Markdown),
            "txt" | "text" | "log" | "json" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InlineText => "inline_text",
            Self::Markdown => "markdown",
            Self::PlainText => "plain_text",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote work needed before a preview can be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFetch {
    /// Read the article body by document id; no storage access.
    ArticleContent,
    /// Resolve the storage path to a URL, then fetch the text behind it.
    RemoteText,
    /// Resolve the storage path to a URL and hand it to the renderer.
    RemoteUrl,
    /// Resolve a download URL; the viewer offers it as a link.
    DownloadLink,
    /// Nothing to fetch.
    Nothing,
}

/// Classification result for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPlan {
    pub mode: RenderMode,
    pub fetch: PayloadFetch,
}

/// Decide how to render a document and what must be fetched to do so.
///
/// Rules, first match wins: articles render inline; a markdown extension or
/// type renders as markdown; a text extension or type renders as plain text;
/// images and PDFs render from a URL; everything else is unsupported and
/// offers a download link when a file is stored.
pub fn classify(doc: &Document) -> PreviewPlan {
    let path = doc.storage_path();
    let by_ext = path
        .and_then(extension_of)
        .and_then(|ext| RenderMode::for_extension(&ext));

    let mode = match (RenderMode::for_type(doc.doc_type), by_ext) {
        (RenderMode::InlineText, _) => RenderMode::InlineText,
        (RenderMode::Markdown, _) | (_, Some(RenderMode::Markdown)) => RenderMode::Markdown,
        (RenderMode::PlainText, _) | (_, Some(RenderMode::PlainText)) => RenderMode::PlainText,
        (mode, _) => mode,
    };

    let fetch = match (mode, path.is_some()) {
        (RenderMode::InlineText, _) => PayloadFetch::ArticleContent,
        (RenderMode::Markdown | RenderMode::PlainText, true) => PayloadFetch::RemoteText,
        (RenderMode::Image | RenderMode::Pdf, true) => PayloadFetch::RemoteUrl,
        (RenderMode::Unsupported, true) => PayloadFetch::DownloadLink,
        (_, false) => PayloadFetch::Nothing,
    };

    PreviewPlan { mode, fetch }
}

// =============================================================================
// PDF VIEW STATE
// =============================================================================

/// Page and zoom state of the PDF viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfView {
    /// 1-based current page
    pub page: u32,
    /// Known once the renderer has loaded the document
    pub page_count: Option<u32>,
    pub zoom: f32,
}

impl Default for PdfView {
    fn default() -> Self {
        Self {
            page: 1,
            page_count: None,
            zoom: 1.0,
        }
    }
}

impl PdfView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the page count reported by the renderer, pulling the current
    /// page back into range if needed.
    pub fn set_page_count(&mut self, count: u32) {
        let count = count.max(1);
        self.page_count = Some(count);
        self.page = self.page.clamp(1, count);
    }

    pub fn has_next(&self) -> bool {
        self.page_count.is_some_and(|n| self.page < n)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Advance one page. Returns false at the last page or before the page
    /// count is known.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Jump to a page, clamped to the valid range. Returns the page landed on.
    pub fn go_to(&mut self, page: u32) -> u32 {
        let upper = self.page_count.unwrap_or(1);
        self.page = page.clamp(1, upper);
        self.page
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.zoom + PDF_ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.zoom - PDF_ZOOM_STEP)
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    fn set_zoom(&mut self, zoom: f32) -> f32 {
        // snap to hundredths so repeated steps don't accumulate float error
        self.zoom = ((zoom * 100.0).round() / 100.0).clamp(PDF_ZOOM_MIN, PDF_ZOOM_MAX);
        self.zoom
    }
}

// =============================================================================
// PAYLOAD LOADING
// =============================================================================

/// Renderable preview payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewContent {
    Article { text: String },
    Markdown { text: String },
    PlainText { text: String },
    Image { url: String },
    Pdf { url: String, view: PdfView },
    Unsupported { download_url: Option<String> },
}

impl PreviewContent {
    pub fn mode(&self) -> RenderMode {
        match self {
            Self::Article { .. } => RenderMode::InlineText,
            Self::Markdown { .. } => RenderMode::Markdown,
            Self::PlainText { .. } => RenderMode::PlainText,
            Self::Image { .. } => RenderMode::Image,
            Self::Pdf { .. } => RenderMode::Pdf,
            Self::Unsupported { .. } => RenderMode::Unsupported,
        }
    }
}

/// Fetch whatever `plan` requires for document `id`.
pub async fn resolve_payload(
    store: &dyn DocumentStore,
    id: Uuid,
    plan: PreviewPlan,
) -> Result<PreviewContent> {
    match (plan.mode, plan.fetch) {
        (_, PayloadFetch::ArticleContent) => {
            let text = store.get_article_content(id).await?;
            Ok(PreviewContent::Article { text })
        }
        (mode, PayloadFetch::RemoteText) => {
            let source = store.preview(id).await?;
            let text = store.fetch_text(&source.url).await?;
            Ok(match mode {
                RenderMode::Markdown => PreviewContent::Markdown { text },
                _ => PreviewContent::PlainText { text },
            })
        }
        (RenderMode::Pdf, PayloadFetch::RemoteUrl) => {
            let source = store.preview(id).await?;
            Ok(PreviewContent::Pdf {
                url: source.url,
                view: PdfView::new(),
            })
        }
        (_, PayloadFetch::RemoteUrl) => {
            let source = store.preview(id).await?;
            Ok(PreviewContent::Image { url: source.url })
        }
        (_, PayloadFetch::DownloadLink) => {
            let url = store.resolve_download_url(id).await?;
            Ok(PreviewContent::Unsupported {
                download_url: Some(url),
            })
        }
        (RenderMode::Unsupported, PayloadFetch::Nothing) => Ok(PreviewContent::Unsupported {
            download_url: None,
        }),
        (mode, PayloadFetch::Nothing) => Err(Error::NotFound(format!(
            "No stored file to render as {}",
            mode
        ))),
    }
}

// =============================================================================
// PREVIEW SESSION
// =============================================================================

/// What the viewer currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviewState {
    #[default]
    Closed,
    Loading {
        document_id: Uuid,
        mode: RenderMode,
    },
    Ready {
        document_id: Uuid,
        content: PreviewContent,
    },
    Failed {
        document_id: Uuid,
        message: String,
    },
}

impl PreviewState {
    pub fn document_id(&self) -> Option<Uuid> {
        match self {
            Self::Closed => None,
            Self::Loading { document_id, .. }
            | Self::Ready { document_id, .. }
            | Self::Failed { document_id, .. } => Some(*document_id),
        }
    }
}

/// Handle for one open request. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket {
    pub generation: u64,
    pub document_id: Uuid,
    pub plan: PreviewPlan,
}

#[derive(Debug, Default)]
struct SessionInner {
    generation: u64,
    state: PreviewState,
}

/// Viewer state guarded by a generation counter.
///
/// Every `open` and `close` bumps the generation. A load only commits if
/// its ticket still carries the current generation, so out-of-order
/// completions are dropped instead of overwriting newer state.
#[derive(Debug, Default)]
pub struct PreviewSession {
    inner: Mutex<SessionInner>,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start showing `doc`; any in-flight load for another document becomes stale.
    pub fn open(&self, doc: &Document) -> PreviewTicket {
        let plan = classify(doc);
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = PreviewState::Loading {
            document_id: doc.id,
            mode: plan.mode,
        };
        debug!(
            document_id = %doc.id,
            render_mode = %plan.mode,
            generation = inner.generation,
            "Preview opened"
        );
        PreviewTicket {
            generation: inner.generation,
            document_id: doc.id,
            plan,
        }
    }

    /// Close the viewer; in-flight loads become stale.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = PreviewState::Closed;
    }

    pub fn is_current(&self, ticket: &PreviewTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    /// Apply a finished load. Returns false, leaving state untouched, when
    /// the ticket has been superseded.
    pub fn commit(&self, ticket: &PreviewTicket, result: Result<PreviewContent>) -> bool {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!(
                document_id = %ticket.document_id,
                generation = ticket.generation,
                current = inner.generation,
                "Discarding stale preview result"
            );
            return false;
        }
        inner.state = match result {
            Ok(content) => PreviewState::Ready {
                document_id: ticket.document_id,
                content,
            },
            Err(e) => PreviewState::Failed {
                document_id: ticket.document_id,
                message: e.to_string(),
            },
        };
        true
    }

    /// Open `doc`, fetch its payload, and commit if still current.
    pub async fn load(&self, store: &dyn DocumentStore, doc: &Document) -> bool {
        let ticket = self.open(doc);
        let result = resolve_payload(store, ticket.document_id, ticket.plan).await;
        self.commit(&ticket, result)
    }

    pub fn state(&self) -> PreviewState {
        self.lock().state.clone()
    }

    /// Mutate the PDF view of the ready document. Returns false when no PDF
    /// is showing.
    pub fn update_pdf_view(&self, f: impl FnOnce(&mut PdfView)) -> bool {
        let mut inner = self.lock();
        match &mut inner.state {
            PreviewState::Ready {
                content: PreviewContent::Pdf { view, .. },
                ..
            } => {
                f(view);
                true
            }
            _ => false,
        }
    }
}
