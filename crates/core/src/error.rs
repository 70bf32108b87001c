use docstore_files::FilesError;
use docstore_types::TypesError;

#[derive(Debug, thiserror::Error)]
pub enum DocstoreError {
    #[error("no such object: {0}")]
    NotFound(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("Incorrect SHA256 hash on upload: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to render thumbnail: {0}")]
    RenderFailure(String),

    #[error("file storage error: {0}")]
    Files(FilesError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize documents: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize documents: {0}")]
    Deserialization(serde_json::Error),
}

impl DocstoreError {
    /// True for errors caused by what the caller sent rather than by the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::InvalidArgument(_)
        )
    }
}

impl From<FilesError> for DocstoreError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::RenderFailure(msg) => Self::RenderFailure(msg),
            FilesError::Io(e) => Self::Io(e),
            other => Self::Files(other),
        }
    }
}

impl From<TypesError> for DocstoreError {
    fn from(err: TypesError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type DocstoreResult<T> = std::result::Result<T, DocstoreError>;
