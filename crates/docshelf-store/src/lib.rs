//! # docshelf-store
//!
//! [`DocumentStore`](docshelf_core::DocumentStore) backends for docshelf.
//!
//! - [`RemoteDocumentStore`]: hosted REST database plus object storage
//! - [`MemoryDocumentStore`]: in-process store for tests and offline use
//!
//! Also provides the store configuration layer and tracing setup.

pub mod config;
pub mod memory;
pub mod remote;
pub mod telemetry;

pub use config::{ConfigError, ConfigResult, StoreConfig};
pub use memory::MemoryDocumentStore;
pub use remote::RemoteDocumentStore;
pub use telemetry::init_tracing;
