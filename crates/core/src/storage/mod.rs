//! Keyed storage of document records.
//!
//! An [`ObjectStore`] maps string ids to JSON objects. Two backends are provided:
//!
//! - [`MemoryObjectStore`]: a map behind a lock, for tests and throwaway stores
//! - [`JsonObjectStore`]: a single pretty-printed JSON file, replaced atomically on
//!   every write
//!
//! Reads never observe a partially applied write in either backend.

mod json;
mod memory;

pub use json::JsonObjectStore;
pub use memory::MemoryObjectStore;

use crate::{DocstoreError, DocstoreResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// A map from string ids to JSON objects.
///
/// Implementations are shared between threads behind an `Arc`.
pub trait ObjectStore: Send + Sync {
    /// Returns the object stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocstoreError::NotFound`] if there is no such object.
    fn get(&self, id: &str) -> DocstoreResult<Value>;

    /// Stores `object` under `id`, replacing any existing object.
    fn put(&self, id: &str, object: Value) -> DocstoreResult<()>;

    /// Stores `object` under `id` only if the id is unused.
    ///
    /// The check and the write are a single step with respect to other writers of
    /// the same store.
    ///
    /// # Errors
    ///
    /// Returns [`DocstoreError::AlreadyExists`] if `id` is taken.
    fn put_new(&self, id: &str, object: Value) -> DocstoreResult<()>;

    /// Returns every stored object, keyed and ordered by id.
    fn objects(&self) -> DocstoreResult<BTreeMap<String, Value>>;

    fn contains(&self, id: &str) -> DocstoreResult<bool> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(DocstoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn len(&self) -> DocstoreResult<usize> {
        Ok(self.objects()?.len())
    }

    fn is_empty(&self) -> DocstoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Rejects ids no backend can store.
pub(crate) fn validate_id(id: &str) -> DocstoreResult<()> {
    if id.is_empty() {
        return Err(DocstoreError::InvalidArgument(
            "object id must not be empty".into(),
        ));
    }
    Ok(())
}
