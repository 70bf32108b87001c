//! Document records and upload requests.

use crate::{DocstoreError, DocstoreResult};
use chrono::{DateTime, Utc};
use docstore_types::Sha256Checksum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A stored document, as kept in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Path of the stored file, relative to the files root
    pub file_identifier: String,
    /// Path of the thumbnail, relative to the thumbnails root, once rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_identifier: Option<String>,
    pub sha256_checksum: Sha256Checksum,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Filename the document was uploaded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_data: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// True if the record carries every tag in `tags`.
    pub fn has_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter()
            .all(|wanted| self.tags.iter().any(|tag| tag == wanted.as_ref()))
    }

    pub fn to_value(&self) -> DocstoreResult<Value> {
        serde_json::to_value(self).map_err(DocstoreError::Serialization)
    }

    pub fn from_value(value: Value) -> DocstoreResult<Self> {
        serde_json::from_value(value).map_err(DocstoreError::Deserialization)
    }
}

/// A document as submitted for indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    /// Raw file bytes
    pub file: Vec<u8>,
    /// Checksum claimed by the client, if any
    pub sha256_checksum: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub source_url: Option<String>,
    pub user_data: BTreeMap<String, String>,
}

impl NewDocument {
    pub fn new(file: impl Into<Vec<u8>>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Builds a document from the fields of an upload form.
    ///
    /// `tags` is split on whitespace. Fields without a meaning of their own are kept
    /// as user data unless blank. Blank known fields are treated as absent.
    pub fn from_form<K, V>(
        file: impl Into<Vec<u8>>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut doc = Self::new(file);

        for (key, value) in fields {
            let key = key.into();
            let value = value.into();
            if value.trim().is_empty() {
                continue;
            }

            match key.as_str() {
                "title" => doc.title = Some(value),
                "filename" => doc.filename = Some(value),
                "sha256_checksum" => doc.sha256_checksum = Some(value),
                "source_url" => doc.source_url = Some(value),
                "tags" => doc.tags = value.split_whitespace().map(str::to_owned).collect(),
                _ => {
                    doc.user_data.insert(key, value);
                }
            }
        }

        doc
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.sha256_checksum = Some(checksum.into());
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> DocumentRecord {
        DocumentRecord {
            file_identifier: "g/greeting.txt".into(),
            thumbnail_identifier: None,
            sha256_checksum: Sha256Checksum::of(b"hello world"),
            date_created: "2019-05-04T12:30:00Z".parse().unwrap(),
            title: Some("Greeting".into()),
            tags: vec!["alpha".into(), "beta".into()],
            filename: Some("greeting.txt".into()),
            source_url: None,
            user_data: BTreeMap::new(),
        }
    }

    #[test]
    fn test_record_json_shape() {
        let value = record().to_value().unwrap();

        assert_eq!(
            value,
            json!({
                "file_identifier": "g/greeting.txt",
                "sha256_checksum": "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
                "date_created": "2019-05-04T12:30:00Z",
                "title": "Greeting",
                "tags": ["alpha", "beta"],
                "filename": "greeting.txt",
            })
        );
        assert_eq!(DocumentRecord::from_value(value).unwrap(), record());
    }

    #[test]
    fn test_record_rejects_bad_checksum() {
        let mut value = record().to_value().unwrap();
        value["sha256_checksum"] = json!("not-a-digest");

        assert!(matches!(
            DocumentRecord::from_value(value),
            Err(DocstoreError::Deserialization(_))
        ));
    }

    #[test]
    fn test_has_tags_requires_all() {
        let record = record();

        assert!(record.has_tags::<&str>(&[]));
        assert!(record.has_tags(&["alpha"]));
        assert!(record.has_tags(&["beta", "alpha"]));
        assert!(!record.has_tags(&["alpha", "gamma"]));
    }

    #[test]
    fn test_from_form_sorts_fields() {
        let doc = NewDocument::from_form(
            b"hello world".to_vec(),
            [
                ("title", "Hello"),
                ("tags", "  receipts 2019\ttax "),
                ("filename", "greeting.txt"),
                ("sha256_checksum", "abc"),
                ("category", "letters"),
                ("empty", ""),
                ("source_url", "https://example.org/greeting"),
            ],
        );

        assert_eq!(doc.title.as_deref(), Some("Hello"));
        assert_eq!(doc.tags, ["receipts", "2019", "tax"]);
        assert_eq!(doc.filename.as_deref(), Some("greeting.txt"));
        assert_eq!(doc.sha256_checksum.as_deref(), Some("abc"));
        assert_eq!(doc.source_url.as_deref(), Some("https://example.org/greeting"));
        assert_eq!(
            doc.user_data,
            BTreeMap::from([("category".to_string(), "letters".to_string())])
        );
        assert_eq!(doc.file, b"hello world");
    }
}
