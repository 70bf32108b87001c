//! Sharded file storage
//!
//! This module provides [`FileManager`], which places uploaded bytes under a root
//! directory using human-readable names where possible.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! ├── g/
//! │   ├── greeting.txt      # name derived from the original filename
//! │   └── g81c…e2.txt       # fallback: the document id
//! └── s/
//!     └── scan-2019.pdf
//! ```
//!
//! The shard directory is the lowercased first character of the stored name.
//!
//! # Claiming Names
//!
//! A name is claimed by creating the file with `create_new`, which fails atomically
//! if the path already exists. Two writers racing for `greeting.txt` therefore cannot
//! both win: the loser falls back to `<id-shard>/<id>.txt`. Ids are unique per
//! document, so the fallback is uncontended under correct usage; it is still claimed
//! exclusively and a clash is reported as [`FilesError::FileAlreadyExists`].
//!
//! Stored files are never rewritten. A document whose preferred name is taken gets a
//! new name instead.

use crate::naming::{detect_extension, slugify, split_filename};
use crate::FilesError;
use docstore_types::DocumentId;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

/// Places byte buffers in a sharded directory tree.
///
/// The manager holds no state beyond its root, so any number of managers (in any
/// number of threads) may share one root directory.
#[derive(Debug, Clone)]
pub struct FileManager {
    /// Directory under which all shards live
    root: PathBuf,
}

impl FileManager {
    /// Creates a manager rooted at `root`.
    ///
    /// The root does not have to exist yet; it is created (with any missing parents)
    /// on first write.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if `root` exists but is not a
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FilesError> {
        let root = root.into();

        if root.exists() && !root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores `buffer` and returns its path relative to the root.
    ///
    /// The name is derived from `original_filename` when it transliterates to
    /// something usable, otherwise from `id`. The extension comes from the buffer's
    /// sniffed format, falling back to the extension of `original_filename`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - both the preferred and the id-based name are already taken
    /// - directory creation or the write itself fails (I/O)
    pub fn write(
        &self,
        id: &DocumentId,
        buffer: &[u8],
        original_filename: Option<&str>,
    ) -> Result<PathBuf, FilesError> {
        let extension = detect_extension(buffer, original_filename);
        self.write_with_extension(id, buffer, original_filename, extension.as_deref())
    }

    /// Stores `buffer` like [`Self::write`], but with an extension the caller has
    /// already decided on (`None` for no extension).
    ///
    /// # Errors
    ///
    /// Same as [`Self::write`].
    pub fn write_with_extension(
        &self,
        id: &DocumentId,
        buffer: &[u8],
        original_filename: Option<&str>,
        extension: Option<&str>,
    ) -> Result<PathBuf, FilesError> {
        let base_name = original_filename.and_then(|name| slugify(split_filename(name).0));
        let preferred = base_name.as_deref().unwrap_or(id.as_str());
        if let Some(path) = self.try_store(preferred, extension, buffer)? {
            return Ok(path);
        }

        let fallback = entry_path(id.as_str(), extension);
        if preferred != id.as_str() {
            tracing::debug!(
                taken = %entry_path(preferred, extension).display(),
                fallback = %fallback.display(),
                "stored name already claimed, falling back to id"
            );

            if let Some(path) = self.try_store(id.as_str(), extension, buffer)? {
                return Ok(path);
            }
        }

        Err(FilesError::FileAlreadyExists(fallback.display().to_string()))
    }

    /// Stores `buffer` under exactly `<shard>/<name>[.<extension>]`.
    ///
    /// Returns `Ok(None)` if that name is already taken.
    pub(crate) fn try_store(
        &self,
        name: &str,
        extension: Option<&str>,
        buffer: &[u8],
    ) -> Result<Option<PathBuf>, FilesError> {
        let relative_path = entry_path(name, extension);
        match self.claim(&relative_path)? {
            Some(file) => {
                self.fill(file, &relative_path, buffer)?;
                Ok(Some(relative_path))
            }
            None => Ok(None),
        }
    }

    /// Reads a stored file by its relative path.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the path escapes the root or the file cannot be read.
    pub fn read(&self, relative_path: &Path) -> Result<Vec<u8>, FilesError> {
        let path = self.absolute_path(relative_path)?;

        fs::read(&path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", path.display(), e),
            ))
        })
    }

    /// Resolves a relative path returned by [`Self::write`] against the root.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] for absolute paths or paths containing
    /// `..`, which could point outside the root.
    pub fn absolute_path(&self, relative_path: &Path) -> Result<PathBuf, FilesError> {
        let is_contained = relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        if !is_contained || relative_path.as_os_str().is_empty() {
            return Err(FilesError::InvalidPath(relative_path.display().to_string()));
        }

        Ok(self.root.join(relative_path))
    }

    /// Exclusively creates `relative_path` under the root.
    ///
    /// Returns `Ok(None)` if the file already exists.
    fn claim(&self, relative_path: &Path) -> Result<Option<File>, FilesError> {
        let path = self.root.join(relative_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to create {}: {}", path.display(), e),
            ))),
        }
    }

    /// Writes `buffer` into a freshly claimed file and flushes it to disk.
    ///
    /// On failure the partially written file is removed so the name is not left
    /// pointing at truncated content.
    fn fill(&self, mut file: File, relative_path: &Path, buffer: &[u8]) -> Result<(), FilesError> {
        let path = self.root.join(relative_path);

        let written = file.write_all(buffer).and_then(|()| file.sync_all());
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "failed to remove partially written file"
                );
            }
            return Err(FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", path.display(), e),
            )));
        }

        tracing::debug!(path = %path.display(), size = buffer.len(), "stored file");
        Ok(())
    }
}

/// Builds `<shard>/<name>[.<extension>]`, with the shard taken from `name`.
fn entry_path(name: &str, extension: Option<&str>) -> PathBuf {
    let shard: String = name
        .chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_default();

    let file_name = match extension {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_owned(),
    };

    Path::new(&shard).join(file_name)
}
