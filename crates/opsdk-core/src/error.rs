//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("file is not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("error getting TypeMeta from bytes: {message}")]
    TypeMeta { message: String },

    #[error("filesystem lock poisoned")]
    LockPoisoned,
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return CoreError::NotFound(path.into());
        }
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means the path simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
