//! # Docstore Core
//!
//! Document records, their storage, and the indexing pipeline.
//!
//! This crate contains:
//! - Object stores mapping document ids to JSON records (in memory or in one JSON file)
//! - The indexing pipeline that verifies, places and records an upload
//! - [`DocumentService`], which wires a store to the file and thumbnail managers
//!
//! **No front-end concerns**: argument parsing, logging setup and environment loading
//! belong in the binary.
//!
//! ## Example Usage
//!
//! ```no_run
//! use docstore_core::{DocstoreConfig, DocumentService, NewDocument};
//!
//! # fn main() -> Result<(), docstore_core::DocstoreError> {
//! let cfg = DocstoreConfig::new("docstore_data")?;
//! let service = DocumentService::open(&cfg)?;
//!
//! let doc = NewDocument::new(b"hello world".to_vec())
//!     .with_filename("greeting.txt")
//!     .with_tags(["letters"]);
//! let (id, record) = service.upload(doc)?;
//! println!("{id}: {}", record.file_identifier);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod index;
pub mod service;
pub mod storage;

pub use config::DocstoreConfig;
pub use document::{DocumentRecord, NewDocument};
pub use error::{DocstoreError, DocstoreResult};
pub use index::{index_new_document, verify_checksum};
pub use service::DocumentService;
pub use storage::{JsonObjectStore, MemoryObjectStore, ObjectStore};

pub use docstore_types::{DocumentId, Sha256Checksum};
