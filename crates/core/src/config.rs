//! Core runtime configuration.
//!
//! Resolved once at startup (binary) and passed into the service, so the core
//! crate never reads process-wide environment variables itself.

use crate::constants::{
    DEFAULT_DOCSTORE_ROOT, DOCUMENTS_FILENAME, FILES_DIR_NAME, THUMBNAILS_DIR_NAME,
};
use crate::{DocstoreError, DocstoreResult};
use std::path::{Path, PathBuf};

/// Where a docstore keeps its records, files and thumbnails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocstoreConfig {
    root: PathBuf,
}

impl DocstoreConfig {
    /// Creates a configuration rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DocstoreError::InvalidArgument`] if `root` is empty or exists but is
    /// not a directory.
    pub fn new(root: impl Into<PathBuf>) -> DocstoreResult<Self> {
        let root = root.into();

        if root.as_os_str().is_empty() {
            return Err(DocstoreError::InvalidArgument(
                "docstore root must not be empty".into(),
            ));
        }
        if root.exists() && !root.is_dir() {
            return Err(DocstoreError::InvalidArgument(format!(
                "docstore root is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Resolves the root from an explicit override, then an environment value, then
    /// the default.
    ///
    /// Blank values are treated as unset.
    pub fn resolve(
        explicit: Option<PathBuf>,
        env_value: Option<String>,
    ) -> DocstoreResult<Self> {
        let root = explicit
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| {
                env_value
                    .map(|value| value.trim().to_owned())
                    .filter(|value| !value.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCSTORE_ROOT));

        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the JSON object store holding every record.
    pub fn documents_path(&self) -> PathBuf {
        self.root.join(DOCUMENTS_FILENAME)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR_NAME)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR_NAME)
    }
}
