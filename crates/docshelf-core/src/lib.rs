//! # docshelf-core
//!
//! Core types and client-side logic for the docshelf personal document
//! library.
//!
//! This crate provides:
//! - The document data model and the closed set of document types
//! - The filter engine and the filter-panel collections derived from it
//! - Preview classification, payload loading and the stale-write guard
//! - Upload preparation (size ceiling, type and colour inference)
//! - The [`DocumentStore`] trait every backend implements
//! - The [`Library`] controller tying the above together
//!
//! Concrete stores live in `docshelf-store`.

pub mod collections;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod library;
pub mod models;
pub mod preview;
pub mod state;
pub mod temporal;
pub mod traits;
pub mod upload;

// Re-export commonly used types at crate root
pub use collections::{available_categories, available_tags};
pub use error::{Error, Result};
pub use filter::{filter_documents, filter_documents_at, CategoryChoice, FilterOptions, TypeChoice};
pub use library::{ConnectionStatus, Library, SectionCounts};
pub use models::*;
pub use preview::{
    classify, resolve_payload, PayloadFetch, PdfView, PreviewContent, PreviewPlan, PreviewSession,
    PreviewState, PreviewTicket, RenderMode,
};
pub use state::FilterState;
pub use temporal::{start_of_day, Timeframe};
pub use traits::*;
pub use upload::{PreparedUpload, UploadProgress};
