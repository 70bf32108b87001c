//! Document service
//!
//! [`DocumentService`] ties one object store to one file store and one thumbnail
//! store, and is the entry point the binary (or any other front end) talks to.
//!
//! Record updates made through a service are serialised by its writer lock, so a
//! thumbnail finishing in the background cannot lose a concurrent index.

use crate::config::DocstoreConfig;
use crate::document::{DocumentRecord, NewDocument};
use crate::index::{
    index_new_document, load_record, record_thumbnail, render_document_thumbnail,
};
use crate::storage::{JsonObjectStore, ObjectStore};
use crate::{DocstoreError, DocstoreResult};
use docstore_files::{FileManager, ThumbnailManager};
use docstore_types::DocumentId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Indexes, looks up and thumbnails documents.
pub struct DocumentService {
    store: Arc<dyn ObjectStore>,
    files: FileManager,
    thumbnails: ThumbnailManager,
    writer: Mutex<()>,
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        files: FileManager,
        thumbnails: ThumbnailManager,
    ) -> Self {
        Self {
            store,
            files,
            thumbnails,
            writer: Mutex::new(()),
        }
    }

    /// Opens the JSON-backed docstore laid out under `cfg`'s root.
    pub fn open(cfg: &DocstoreConfig) -> DocstoreResult<Self> {
        let store = Arc::new(JsonObjectStore::new(cfg.documents_path()));
        let files = FileManager::new(cfg.files_dir())?;
        let thumbnails = ThumbnailManager::new(cfg.thumbnails_dir())?;

        tracing::debug!(root = %cfg.root().display(), "opened docstore");
        Ok(Self::new(store, files, thumbnails))
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    pub fn thumbnails(&self) -> &ThumbnailManager {
        &self.thumbnails
    }

    /// Indexes `doc` under `doc_id`. See [`index_new_document`].
    pub fn index_document(
        &self,
        doc_id: &DocumentId,
        doc: NewDocument,
    ) -> DocstoreResult<DocumentRecord> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        index_new_document(self.store.as_ref(), &self.files, doc_id, doc)
    }

    /// Indexes `doc` under a freshly generated id.
    pub fn upload(&self, doc: NewDocument) -> DocstoreResult<(DocumentId, DocumentRecord)> {
        let doc_id = DocumentId::generate();
        let record = self.index_document(&doc_id, doc)?;
        Ok((doc_id, record))
    }

    /// Renders the thumbnail for `doc_id` and records it.
    ///
    /// Rendering happens outside the writer lock; only the record update holds it.
    /// Once the new thumbnail is recorded, the one it replaced is deleted.
    pub fn create_document_thumbnail(&self, doc_id: &DocumentId) -> DocstoreResult<DocumentRecord> {
        let thumbnail =
            render_document_thumbnail(self.store.as_ref(), &self.files, &self.thumbnails, doc_id)?;

        let (record, replaced) = {
            let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            record_thumbnail(self.store.as_ref(), doc_id, thumbnail)?
        };
        tracing::debug!(id = %doc_id, "recorded thumbnail");

        if let Some(old) = replaced {
            if let Err(e) = self.thumbnails.remove(Path::new(&old)) {
                tracing::warn!(
                    id = %doc_id,
                    thumbnail = %old,
                    error = %e,
                    "failed to remove replaced thumbnail"
                );
            }
        }

        Ok(record)
    }

    /// Renders the thumbnail for `doc_id` on the blocking thread pool.
    ///
    /// Failures are logged and yield `None`; the document stays indexed without a
    /// thumbnail. Must be called from within a Tokio runtime.
    pub fn spawn_thumbnail(
        self: &Arc<Self>,
        doc_id: DocumentId,
    ) -> JoinHandle<Option<DocumentRecord>> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || match service.create_document_thumbnail(&doc_id) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(id = %doc_id, error = %e, "failed to create thumbnail");
                None
            }
        })
    }

    /// Re-renders the thumbnail of every document.
    ///
    /// Returns the number of documents thumbnailed. Documents that fail are logged
    /// and skipped.
    pub fn recreate_thumbnails(&self) -> DocstoreResult<usize> {
        let ids: Vec<String> = self.store.objects()?.into_keys().collect();
        let mut created = 0;

        for id in ids {
            let doc_id = match DocumentId::new(id.as_str()) {
                Ok(doc_id) => doc_id,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping record with invalid id");
                    continue;
                }
            };

            match self.create_document_thumbnail(&doc_id) {
                Ok(_) => created += 1,
                Err(e) => tracing::warn!(id = %doc_id, error = %e, "failed to recreate thumbnail"),
            }
        }

        tracing::info!(created, "recreated thumbnails");
        Ok(created)
    }

    pub fn get(&self, doc_id: &DocumentId) -> DocstoreResult<DocumentRecord> {
        load_record(self.store.as_ref(), doc_id)
    }

    /// Returns every record, ordered by id.
    pub fn documents(&self) -> DocstoreResult<BTreeMap<String, DocumentRecord>> {
        self.store
            .objects()?
            .into_iter()
            .map(|(id, value)| Ok((id, DocumentRecord::from_value(value)?)))
            .collect()
    }

    /// Returns the records carrying every tag in `tags`.
    pub fn query<S: AsRef<str>>(
        &self,
        tags: &[S],
    ) -> DocstoreResult<BTreeMap<String, DocumentRecord>> {
        let mut documents = self.documents()?;
        documents.retain(|_, record| record.has_tags(tags));
        Ok(documents)
    }

    /// Absolute path of a document's stored file.
    pub fn file_path(&self, record: &DocumentRecord) -> DocstoreResult<PathBuf> {
        Ok(self
            .files
            .absolute_path(Path::new(&record.file_identifier))?)
    }

    /// Absolute path of a document's thumbnail, if it has one.
    pub fn thumbnail_path(&self, record: &DocumentRecord) -> DocstoreResult<Option<PathBuf>> {
        record
            .thumbnail_identifier
            .as_deref()
            .map(|thumbnail| {
                self.thumbnails
                    .files()
                    .absolute_path(Path::new(thumbnail))
                    .map_err(DocstoreError::from)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    fn create_service() -> (Arc<DocumentService>, TempDir) {
        let temp = TempDir::new().unwrap();
        let cfg = DocstoreConfig::new(temp.path()).unwrap();
        (Arc::new(DocumentService::open(&cfg).unwrap()), temp)
    }

    fn jpeg() -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([10, 120, 60])))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
            .unwrap();
        data
    }

    #[test]
    fn test_upload_generates_id() {
        let (service, temp) = create_service();

        let (doc_id, record) = service
            .upload(NewDocument::new(b"hello world".to_vec()).with_filename("greeting.txt"))
            .unwrap();

        assert_eq!(doc_id.as_str().len(), 32);
        assert_eq!(service.get(&doc_id).unwrap(), record);
        assert!(temp.path().join("documents.json").exists());
        assert_eq!(
            service.file_path(&record).unwrap(),
            temp.path().join("files/g/greeting.txt")
        );
    }

    #[test]
    fn test_get_unknown_document() {
        let (service, _temp) = create_service();
        assert!(matches!(
            service.get(&id("missing")),
            Err(DocstoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_query_by_tags() {
        let (service, _temp) = create_service();

        for (doc_id, tags) in [("a", vec!["tax", "2019"]), ("b", vec!["tax"]), ("c", vec![])] {
            let doc = NewDocument::new(doc_id.as_bytes().to_vec()).with_tags(tags);
            service.index_document(&id(doc_id), doc).unwrap();
        }

        let ids =
            |tags: &[&str]| -> Vec<String> { service.query(tags).unwrap().into_keys().collect() };
        assert_eq!(ids(&[]), ["a", "b", "c"]);
        assert_eq!(ids(&["tax"]), ["a", "b"]);
        assert_eq!(ids(&["tax", "2019"]), ["a"]);
        assert!(ids(&["nothing"]).is_empty());
    }

    #[test]
    fn test_create_document_thumbnail() {
        let (service, temp) = create_service();
        service
            .index_document(&id("1234"), NewDocument::new(jpeg()).with_filename("bridge.jpg"))
            .unwrap();

        let record = service.create_document_thumbnail(&id("1234")).unwrap();

        assert_eq!(record.thumbnail_identifier.as_deref(), Some("1/1234.jpg"));
        assert_eq!(
            service.thumbnail_path(&record).unwrap(),
            Some(temp.path().join("thumbnails/1/1234.jpg"))
        );
        assert_eq!(service.get(&id("1234")).unwrap(), record);
    }

    fn thumbnail_files(temp: &TempDir, shard: &str) -> usize {
        std::fs::read_dir(temp.path().join("thumbnails").join(shard))
            .unwrap()
            .count()
    }

    #[test]
    fn test_recreate_thumbnails() {
        let (service, temp) = create_service();
        service
            .index_document(&id("img"), NewDocument::new(jpeg()).with_filename("photo.jpg"))
            .unwrap();
        service
            .index_document(
                &id("txt"),
                NewDocument::new(b"plain".to_vec()).with_filename("notes.txt"),
            )
            .unwrap();
        let first = service.create_document_thumbnail(&id("img")).unwrap();

        let created = service.recreate_thumbnails().unwrap();

        assert_eq!(created, 1);
        let record = service.get(&id("img")).unwrap();
        assert_ne!(record.thumbnail_identifier, first.thumbnail_identifier);
        assert!(service.thumbnail_path(&record).unwrap().unwrap().exists());
        assert!(!service.thumbnail_path(&first).unwrap().unwrap().exists());
        assert_eq!(thumbnail_files(&temp, "i"), 1);
        assert!(service.get(&id("txt")).unwrap().thumbnail_identifier.is_none());
    }

    #[test]
    fn test_recreate_thumbnails_repeatedly() {
        let (service, temp) = create_service();
        service
            .index_document(&id("img"), NewDocument::new(jpeg()).with_filename("photo.jpg"))
            .unwrap();

        for _ in 0..70 {
            assert_eq!(service.recreate_thumbnails().unwrap(), 1);
        }

        let record = service.get(&id("img")).unwrap();
        assert!(service.thumbnail_path(&record).unwrap().unwrap().exists());
        assert_eq!(thumbnail_files(&temp, "i"), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_thumbnail_is_recorded() {
        let (service, _temp) = create_service();
        let (doc_id, _) = service
            .upload(NewDocument::new(jpeg()).with_filename("bridge.jpg"))
            .unwrap();

        let record = service.spawn_thumbnail(doc_id.clone()).await.unwrap().unwrap();

        assert!(record.thumbnail_identifier.is_some());
        assert_eq!(service.get(&doc_id).unwrap(), record);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawned_thumbnail_failure_is_not_fatal() {
        let (service, _temp) = create_service();
        let (doc_id, indexed) = service
            .upload(NewDocument::new(b"plain text".to_vec()))
            .unwrap();

        assert!(service.spawn_thumbnail(doc_id.clone()).await.unwrap().is_none());
        assert_eq!(service.get(&doc_id).unwrap(), indexed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_thumbnail_and_index_do_not_lose_updates() {
        let (service, _temp) = create_service();
        let (doc_id, _) = service
            .upload(NewDocument::new(jpeg()).with_filename("bridge.jpg"))
            .unwrap();

        let thumbnail = service.spawn_thumbnail(doc_id.clone());
        for i in 0..5 {
            let doc = NewDocument::new(format!("note {i}").into_bytes());
            service.index_document(&id(&format!("note-{i}")), doc).unwrap();
        }
        thumbnail.await.unwrap().unwrap();

        assert_eq!(service.documents().unwrap().len(), 6);
        assert!(service.get(&doc_id).unwrap().thumbnail_identifier.is_some());
    }

    #[test]
    fn test_memory_backed_service() {
        let temp = TempDir::new().unwrap();
        let service = DocumentService::new(
            Arc::new(MemoryObjectStore::new()),
            FileManager::new(temp.path().join("files")).unwrap(),
            ThumbnailManager::new(temp.path().join("thumbnails")).unwrap(),
        );

        service
            .index_document(&id("1234"), NewDocument::new(b"hello world".to_vec()))
            .unwrap();
        assert_eq!(service.store().len().unwrap(), 1);
        assert!(!temp.path().join("documents.json").exists());
    }
}
