//! The indexing pipeline: from uploaded bytes to a committed record.
//!
//! 1. Verify the client's checksum, if it sent one
//! 2. Work out the file's extension from its content
//! 3. Refuse ids that are already indexed
//! 4. Place the file in the sharded file store
//! 5. Stamp the record with its creation time and commit it
//!
//! Thumbnails are rendered afterwards with [`render_document_thumbnail`] and
//! attached with [`record_thumbnail`]; a fresh record never has one.

use crate::document::{DocumentRecord, NewDocument};
use crate::storage::ObjectStore;
use crate::{DocstoreError, DocstoreResult};
use chrono::Utc;
use docstore_files::naming::detect_extension;
use docstore_files::{FileManager, ThumbnailManager};
use docstore_types::{DocumentId, Sha256Checksum};
use std::path::Path;

/// Checks `file` against the checksum the client claims for it.
///
/// Returns the actual checksum. A claimed checksum that is not a SHA-256 digest at
/// all cannot match and is reported as a mismatch.
pub fn verify_checksum(file: &[u8], claimed: Option<&str>) -> DocstoreResult<Sha256Checksum> {
    let actual = Sha256Checksum::of(file);

    if let Some(claimed) = claimed {
        let matches = Sha256Checksum::parse(claimed).is_ok_and(|expected| expected == actual);
        if !matches {
            return Err(DocstoreError::ChecksumMismatch {
                expected: claimed.to_owned(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(actual)
}

/// Stores a new document's file and commits its record under `doc_id`.
///
/// # Errors
///
/// Returns `DocstoreError` if:
/// - the claimed checksum does not match ([`DocstoreError::ChecksumMismatch`])
/// - `doc_id` is already indexed ([`DocstoreError::AlreadyExists`]); no file is
///   written in that case unless another writer claimed the id concurrently
/// - the file cannot be placed or the store cannot be written
pub fn index_new_document(
    store: &dyn ObjectStore,
    file_manager: &FileManager,
    doc_id: &DocumentId,
    doc: NewDocument,
) -> DocstoreResult<DocumentRecord> {
    let checksum = verify_checksum(&doc.file, doc.sha256_checksum.as_deref())?;

    let extension = detect_extension(&doc.file, doc.filename.as_deref());
    tracing::debug!(
        id = %doc_id,
        extension = extension.as_deref().unwrap_or("none"),
        size = doc.file.len(),
        "indexing document"
    );

    if store.contains(doc_id.as_str())? {
        return Err(DocstoreError::AlreadyExists(doc_id.to_string()));
    }

    let file_path = file_manager.write_with_extension(
        doc_id,
        &doc.file,
        doc.filename.as_deref(),
        extension.as_deref(),
    )?;

    let record = DocumentRecord {
        file_identifier: path_identifier(&file_path),
        thumbnail_identifier: None,
        sha256_checksum: checksum,
        date_created: Utc::now(),
        title: doc.title,
        tags: doc.tags,
        filename: doc.filename,
        source_url: doc.source_url,
        user_data: doc.user_data,
    };

    store.put_new(doc_id.as_str(), record.to_value()?)?;

    tracing::info!(
        id = %doc_id,
        file = %record.file_identifier,
        "indexed document"
    );
    Ok(record)
}

/// Renders a thumbnail of an indexed document's file.
///
/// Returns the thumbnail's identifier, relative to the thumbnails root. The record
/// itself is left untouched.
pub fn render_document_thumbnail(
    store: &dyn ObjectStore,
    file_manager: &FileManager,
    thumbnail_manager: &ThumbnailManager,
    doc_id: &DocumentId,
) -> DocstoreResult<String> {
    let record = load_record(store, doc_id)?;
    let source = file_manager.absolute_path(Path::new(&record.file_identifier))?;
    let thumbnail = thumbnail_manager.create_thumbnail(doc_id, &source)?;

    Ok(path_identifier(&thumbnail))
}

/// Sets the thumbnail of the current version of `doc_id`'s record.
///
/// Returns the updated record and the thumbnail it replaced, if any. Callers that
/// update records concurrently must serialise this call with their own writes.
pub fn record_thumbnail(
    store: &dyn ObjectStore,
    doc_id: &DocumentId,
    thumbnail_identifier: String,
) -> DocstoreResult<(DocumentRecord, Option<String>)> {
    let mut record = load_record(store, doc_id)?;
    let replaced = record
        .thumbnail_identifier
        .replace(thumbnail_identifier)
        .filter(|old| Some(old) != record.thumbnail_identifier.as_ref());
    store.put(doc_id.as_str(), record.to_value()?)?;

    Ok((record, replaced))
}

pub(crate) fn load_record(
    store: &dyn ObjectStore,
    doc_id: &DocumentId,
) -> DocstoreResult<DocumentRecord> {
    DocumentRecord::from_value(store.get(doc_id.as_str())?)
}

/// Relative paths are recorded with `/` separators on every platform.
fn path_identifier(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
