//! Go type indexing errors

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;

#[derive(Error, Debug)]
pub enum GoTypesError {
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("directory does not exist: {0}")]
    DirNotFound(PathBuf),

    #[error(transparent)]
    Core(#[from] opsdk_core::CoreError),
}

impl GoTypesError {
    pub fn is_dir_not_found(&self) -> bool {
        matches!(self, GoTypesError::DirNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, GoTypesError>;
