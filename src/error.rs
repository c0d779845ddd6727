use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable bytes exist but are not a link mapping.
    #[error("link store at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {op} link store at {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no free short code after {attempts} attempts")]
pub struct GenerationExhausted {
    pub attempts: usize,
}

/// Everything `LinkRegistry` can hand back to the HTTP boundary.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid short code: {0}")]
    InvalidShortcode(String),

    #[error("short code already exists: {0}")]
    ShortcodeTaken(String),

    #[error("link store is unreadable: {0}")]
    CorruptStore(#[source] StoreError),

    #[error(transparent)]
    GenerationExhausted(#[from] GenerationExhausted),

    #[error("link store I/O failed: {0}")]
    Persistence(#[source] StoreError),
}

impl RegistryError {
    /// Client mistakes that retrying with the same input will not fix.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::InvalidShortcode(_) | Self::ShortcodeTaken(_)
        )
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        match value {
            corrupt @ StoreError::Corrupt { .. } => Self::CorruptStore(corrupt),
            other => Self::Persistence(other),
        }
    }
}
