//! Validated identifier and checksum types.
//!
//! Every crate in the workspace passes document identifiers and SHA-256 checksums
//! around. Wrapping them in newtypes means validation happens once, at the boundary,
//! and the rest of the code can rely on the invariants:
//!
//! - [`DocumentId`] is non-empty and safe to use as a single path component
//! - [`Sha256Checksum`] is always 64 lowercase hexadecimal characters, unprefixed

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Prefix some clients put in front of a hex digest.
const SHA256_PREFIX: &str = "sha256:";

/// Errors that can occur when creating validated types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The identifier was empty or could not be used as a path component
    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),

    /// The checksum was not a 64 character hex digest
    #[error("Invalid SHA-256 checksum: '{0}'")]
    InvalidChecksum(String),
}

/// Result type for validated type construction.
pub type TypesResult<T> = Result<T, TypesError>;

/// Identifier of a document, chosen by the caller or generated.
///
/// The identifier is used verbatim as a store key and as a fallback file name, so it
/// must be non-empty and must not contain path separators, NUL bytes, or be one of
/// the special names `.` and `..`. Unlike free text it is *not* trimmed: `" a"` and
/// `"a"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Validates `input` as a document identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidDocumentId`] if the input is empty, contains `/`,
    /// `\` or NUL, or is `.` or `..`.
    pub fn new(input: impl Into<String>) -> TypesResult<Self> {
        let input = input.into();
        if input.is_empty() {
            return Err(TypesError::InvalidDocumentId(
                "identifier cannot be empty".into(),
            ));
        }
        if input == "." || input == ".." {
            return Err(TypesError::InvalidDocumentId(format!(
                "'{input}' is a reserved path name"
            )));
        }
        if input.contains(['/', '\\', '\0']) {
            return Err(TypesError::InvalidDocumentId(format!(
                "'{input}' contains a path separator"
            )));
        }
        Ok(Self(input))
    }

    /// Generates a fresh identifier: a random UUID in simple form
    /// (32 lowercase hex characters, no hyphens).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DocumentId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::new(s)
    }
}

impl serde::Serialize for DocumentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DocumentId::new(s).map_err(serde::de::Error::custom)
    }
}

/// A SHA-256 digest in canonical form: 64 lowercase hex characters without prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Checksum(String);

impl Sha256Checksum {
    /// Computes the checksum of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        Self(hex::encode(digest))
    }

    /// Parses a client-supplied checksum.
    ///
    /// Accepts an optional `sha256:` prefix and upper-case hex digits; the result is
    /// always stored in canonical (lowercase, unprefixed) form.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidChecksum`] if what remains after the prefix is not
    /// exactly 64 hex characters.
    pub fn parse(input: &str) -> TypesResult<Self> {
        let trimmed = input.trim();
        let digest = trimmed.strip_prefix(SHA256_PREFIX).unwrap_or(trimmed);

        if Self::is_hex_digest(digest) {
            return Ok(Self(digest.to_ascii_lowercase()));
        }
        Err(TypesError::InvalidChecksum(input.to_owned()))
    }

    /// Returns true if `input` is 64 hex characters (either case).
    pub fn is_hex_digest(input: &str) -> bool {
        input.len() == 64 && input.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Returns the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Sha256Checksum {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Sha256Checksum {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sha256Checksum::parse(s)
    }
}

impl serde::Serialize for Sha256Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Sha256Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Checksum::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_document_id_accepts_plain_identifiers() {
        for input in ["1", "1234", "ABCD", "550e8400e29b41d4a716446655440000", "a b"] {
            let id = DocumentId::new(input).unwrap();
            assert_eq!(id.as_str(), input);
        }
    }

    #[test]
    fn test_document_id_rejects_empty() {
        assert!(matches!(
            DocumentId::new(""),
            Err(TypesError::InvalidDocumentId(_))
        ));
    }

    #[test]
    fn test_document_id_rejects_path_components() {
        for input in [".", "..", "a/b", "a\\b", "nul\0byte"] {
            assert!(
                DocumentId::new(input).is_err(),
                "expected '{}' to be rejected",
                input.escape_debug()
            );
        }
    }

    #[test]
    fn test_document_id_is_not_trimmed() {
        let id = DocumentId::new(" padded ").unwrap();
        assert_eq!(id.as_str(), " padded ");
    }

    #[test]
    fn test_generated_ids_are_simple_uuids() {
        let id = DocumentId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        assert_ne!(id, DocumentId::generate());
    }

    #[test]
    fn test_document_id_serde() {
        let id = DocumentId::new("doc-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"doc-1\"");

        let parsed: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<DocumentId>("\"\"").is_err());
    }

    #[test]
    fn test_checksum_of_bytes() {
        assert_eq!(Sha256Checksum::of(b"hello world").as_str(), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_checksum_parse_normalises_prefix_and_case() {
        let upper = HELLO_WORLD_SHA256.to_ascii_uppercase();
        let prefixed = format!("sha256:{HELLO_WORLD_SHA256}");

        for input in [HELLO_WORLD_SHA256, upper.as_str(), prefixed.as_str()] {
            let parsed = Sha256Checksum::parse(input).unwrap();
            assert_eq!(parsed.as_str(), HELLO_WORLD_SHA256);
        }
    }

    #[test]
    fn test_checksum_parse_rejects_garbage() {
        for input in ["", "123", "sha256:", &"g".repeat(64), &"a".repeat(65)] {
            assert!(matches!(
                Sha256Checksum::parse(input),
                Err(TypesError::InvalidChecksum(_))
            ));
        }
    }
}
