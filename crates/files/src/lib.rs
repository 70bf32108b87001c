//! Docstore File Storage
//!
//! This crate places uploaded document bytes and their thumbnails on the local
//! filesystem.
//!
//! ## Design Principles
//!
//! - Stored names are human-readable where possible, derived from the upload's filename
//! - Files are immutable once written; a taken name means a new name, never an overwrite
//! - Name allocation is safe under concurrent writers without any lock: names are
//!   claimed by exclusive file creation
//! - Extensions come from the content itself, not from what the client claims
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── files/
//! │   └── c/
//! │       └── cingleton.txt
//! └── thumbnails/
//!     └── 1/
//!         └── 1234.jpg
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use docstore_files::FileManager;
//! use docstore_types::DocumentId;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = FileManager::new("docstore_data/files")?;
//! let id = DocumentId::new("1234")?;
//!
//! let path = manager.write(&id, b"hello world", Some("greeting.txt"))?;
//! assert_eq!(path, std::path::Path::new("g/greeting.txt"));
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
pub mod naming;
mod sniff;
mod thumbnails;

pub use constants::{ANIMATION_FRAME_STRIDE, THUMBNAIL_MAX_DIMENSION};
pub use docstore_types::DocumentId;
pub use files::FileManager;
pub use sniff::FileFormat;
pub use thumbnails::{render_thumbnail, RenderedThumbnail, ThumbnailManager};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root path exists but is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Neither the preferred nor the id-based name could be claimed
    #[error("File {0} already exists in storage")]
    FileAlreadyExists(String),

    /// The source could not be turned into a thumbnail
    #[error("Failed to render thumbnail: {0}")]
    RenderFailure(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
