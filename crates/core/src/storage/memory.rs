use super::{validate_id, ObjectStore};
use crate::{DocstoreError, DocstoreResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// An [`ObjectStore`] that lives only as long as the value.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Value>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `objects`.
    pub fn with_objects(objects: BTreeMap<String, Value>) -> Self {
        Self {
            objects: RwLock::new(objects),
        }
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, id: &str) -> DocstoreResult<Value> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects
            .get(id)
            .cloned()
            .ok_or_else(|| DocstoreError::NotFound(id.to_owned()))
    }

    fn put(&self, id: &str, object: Value) -> DocstoreResult<()> {
        validate_id(id)?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.insert(id.to_owned(), object);
        Ok(())
    }

    fn put_new(&self, id: &str, object: Value) -> DocstoreResult<()> {
        validate_id(id)?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if objects.contains_key(id) {
            return Err(DocstoreError::AlreadyExists(id.to_owned()));
        }
        objects.insert(id.to_owned(), object);
        Ok(())
    }

    fn objects(&self) -> DocstoreResult<BTreeMap<String, Value>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.clone())
    }

    fn len(&self) -> DocstoreResult<usize> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_then_get() {
        let store = MemoryObjectStore::new();
        store.put("a", json!({"title": "First"})).unwrap();

        assert_eq!(store.get("a").unwrap(), json!({"title": "First"}));
        assert!(store.contains("a").unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_missing_object() {
        let store = MemoryObjectStore::new();

        assert!(matches!(store.get("nope"), Err(DocstoreError::NotFound(id)) if id == "nope"));
        assert!(!store.contains("nope").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_put_replaces() {
        let store = MemoryObjectStore::new();
        store.put("a", json!({"v": 1})).unwrap();
        store.put("a", json!({"v": 2})).unwrap();

        assert_eq!(store.get("a").unwrap(), json!({"v": 2}));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_put_new_refuses_existing_id() {
        let store = MemoryObjectStore::new();
        store.put_new("a", json!({"v": 1})).unwrap();

        let result = store.put_new("a", json!({"v": 2}));
        assert!(matches!(result, Err(DocstoreError::AlreadyExists(_))));
        assert_eq!(store.get("a").unwrap(), json!({"v": 1}));
    }

    #[test]
    fn test_empty_id_rejected() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.put("", json!({})),
            Err(DocstoreError::InvalidArgument(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_initial_objects() {
        let store = MemoryObjectStore::with_objects(BTreeMap::from([
            ("b".to_string(), json!({"n": 2})),
            ("a".to_string(), json!({"n": 1})),
        ]));

        let ids: Vec<String> = store.objects().unwrap().into_keys().collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
