//! JSON file object store
//!
//! The whole store is one JSON object in one file, written with sorted keys and
//! two-space indentation so that it diffs cleanly under version control.
//!
//! Writes go to a temporary file in the same directory, are flushed, and then
//! renamed over the store file. Readers in any process therefore see either the
//! old or the new content, never a mix.
//!
//! Parsed content is cached per instance and reused while the file's modification
//! time and length are unchanged.

use super::{validate_id, ObjectStore};
use crate::{DocstoreError, DocstoreResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use tempfile::NamedTempFile;

type Objects = BTreeMap<String, Value>;

/// Identifies one version of the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(metadata: &Metadata) -> io::Result<Self> {
        Ok(Self {
            modified: metadata.modified()?,
            len: metadata.len(),
        })
    }
}

#[derive(Debug)]
struct Cached {
    stamp: FileStamp,
    objects: Arc<Objects>,
}

/// An [`ObjectStore`] persisted as a single JSON file.
#[derive(Debug)]
pub struct JsonObjectStore {
    path: PathBuf,
    cache: Mutex<Option<Cached>>,
    /// Serialises read-modify-write cycles of this instance.
    writer: Mutex<()>,
}

impl JsonObjectStore {
    /// Opens the store at `path`. A missing file is an empty store; the file and its
    /// parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current content, from cache when the file is unchanged.
    fn load(&self) -> DocstoreResult<Arc<Objects>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
                return Ok(Arc::new(Objects::new()));
            }
            Err(e) => return Err(self.io_error("open", e)),
        };

        // Stat the open handle: a concurrent rename cannot split the stamp from
        // the content read below.
        let stamp = file
            .metadata()
            .and_then(|metadata| FileStamp::of(&metadata))
            .map_err(|e| self.io_error("stat", e))?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref().filter(|cached| cached.stamp == stamp) {
            return Ok(Arc::clone(&cached.objects));
        }

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| self.io_error("read", e))?;

        let objects = if content.trim().is_empty() {
            Objects::new()
        } else {
            serde_json::from_str(&content).map_err(DocstoreError::Deserialization)?
        };

        tracing::debug!(
            path = %self.path.display(),
            objects = objects.len(),
            "loaded object store"
        );

        let objects = Arc::new(objects);
        *cache = Some(Cached {
            stamp,
            objects: Arc::clone(&objects),
        });
        Ok(objects)
    }

    /// Atomically replaces the store file with `objects`.
    fn commit(&self, objects: Objects) -> DocstoreResult<()> {
        let mut content =
            serde_json::to_string_pretty(&objects).map_err(DocstoreError::Serialization)?;
        content.push('\n');

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| self.io_error("stage", e))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| self.io_error("write", e))?;

        // The rename keeps the inode, so this is the stamp readers will see.
        let stamp = temp
            .as_file()
            .metadata()
            .and_then(|metadata| FileStamp::of(&metadata))
            .map_err(|e| self.io_error("stat", e))?;

        temp.persist(&self.path)
            .map_err(|e| self.io_error("replace", e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            objects = objects.len(),
            "committed object store"
        );

        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(Cached {
            stamp,
            objects: Arc::new(objects),
        });
        Ok(())
    }

    /// Applies `change` to the freshest content and commits the result.
    fn update(
        &self,
        change: impl FnOnce(&mut Objects) -> DocstoreResult<()>,
    ) -> DocstoreResult<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut objects = Arc::unwrap_or_clone(self.load()?);
        change(&mut objects)?;
        self.commit(objects)
    }

    fn io_error(&self, action: &str, e: io::Error) -> DocstoreError {
        DocstoreError::Io(io::Error::new(
            e.kind(),
            format!("Failed to {action} {}: {e}", self.path.display()),
        ))
    }
}

impl ObjectStore for JsonObjectStore {
    fn get(&self, id: &str) -> DocstoreResult<Value> {
        self.load()?
            .get(id)
            .cloned()
            .ok_or_else(|| DocstoreError::NotFound(id.to_owned()))
    }

    fn put(&self, id: &str, object: Value) -> DocstoreResult<()> {
        validate_id(id)?;
        self.update(|objects| {
            objects.insert(id.to_owned(), object);
            Ok(())
        })
    }

    fn put_new(&self, id: &str, object: Value) -> DocstoreResult<()> {
        validate_id(id)?;
        self.update(|objects| {
            if objects.contains_key(id) {
                return Err(DocstoreError::AlreadyExists(id.to_owned()));
            }
            objects.insert(id.to_owned(), object);
            Ok(())
        })
    }

    fn objects(&self) -> DocstoreResult<BTreeMap<String, Value>> {
        Ok(Arc::unwrap_or_clone(self.load()?))
    }

    fn len(&self) -> DocstoreResult<usize> {
        Ok(self.load()?.len())
    }
}
