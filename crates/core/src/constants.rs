//! Constants used throughout the docstore core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase.

/// Filename of the JSON document holding every record.
pub const DOCUMENTS_FILENAME: &str = "documents.json";

/// Directory name for stored document files.
pub const FILES_DIR_NAME: &str = "files";

/// Directory name for rendered thumbnails.
pub const THUMBNAILS_DIR_NAME: &str = "thumbnails";

/// Default store root when no explicit directory is configured.
pub const DEFAULT_DOCSTORE_ROOT: &str = "docstore_data";

/// Environment variable naming the store root.
pub const DOCSTORE_ROOT_ENV: &str = "DOCSTORE_ROOT";
