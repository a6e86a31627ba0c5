//! Descriptor errors

use std::path::PathBuf;

use opsdk_gotypes::{GoTypesError, LiteralError};
use thiserror::Error;

use crate::annotations::AnnotationError;

#[derive(Error, Debug)]
pub enum DescriptorError {
    /// A malformed annotation path, prefix or separator
    #[error(transparent)]
    Grammar(#[from] AnnotationError),

    /// A well-formed annotation with an unusable path or value
    #[error("{message}")]
    Annotation { message: String },

    #[error("directory for API does not exist: {}", .0.display())]
    ApiDirNotExist(PathBuf),

    #[error("kind type for API not found: {kind}")]
    ApiTypeNotFound { kind: String },

    #[error("no package found for API {0}")]
    PackageNotFound(String),

    #[error("error parsing CSV type {type_name} annotations: {source}")]
    TypeAnnotations {
        type_name: String,
        #[source]
        source: Box<DescriptorError>,
    },

    #[error("error parsing {type_name} type member {member} JSON tags: {source}")]
    MemberTags {
        type_name: String,
        member: String,
        #[source]
        source: LiteralError,
    },

    #[error(transparent)]
    GoTypes(#[from] GoTypesError),
}

impl DescriptorError {
    pub(crate) fn annotation(message: impl Into<String>) -> Self {
        DescriptorError::Annotation {
            message: message.into(),
        }
    }

    /// True for the two conditions callers may skip: a missing API
    /// directory or a missing kind type
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DescriptorError::ApiDirNotExist(_) | DescriptorError::ApiTypeNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DescriptorError>;
