//! Annotation grammar
//!
//! Annotations are comment tags such as
//! `+operator-sdk:gen-csv:customresourcedefinitions.specDescriptors=true`.
//! The prefix is a `:`-separated token list starting with the SDK marker,
//! the path is `.`-separated, and `=` separates the path from its value.

use thiserror::Error;

/// Marker token every SDK annotation prefix starts with
pub const SDK_PREFIX: &str = "+operator-sdk";

const PREFIX_SEPARATOR: char = ':';
const PATH_SEPARATOR: char = '.';
const VALUE_SEPARATOR: char = '=';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("prefix {0:?} has no elements")]
    EmptyPrefix(String),

    #[error("prefix {prefix:?} does not begin with +operator-sdk")]
    ForeignPrefix { prefix: String },

    #[error("path {0:?} has no elements")]
    EmptyPath(String),

    #[error("annotation {0:?} must contain exactly one '='")]
    MalformedAnnotation(String),
}

/// Join prefix tokens, e.g. `["+operator-sdk", "gen-csv"]` to `+operator-sdk:gen-csv`
pub fn join_prefix<S: AsRef<str>>(elements: &[S]) -> String {
    join(elements, PREFIX_SEPARATOR)
}

/// Split a prefix into its tokens, requiring the SDK marker first
pub fn split_prefix(prefix: &str) -> Result<Vec<String>, AnnotationError> {
    let elements = split(prefix, PREFIX_SEPARATOR);
    match elements.first() {
        None => Err(AnnotationError::EmptyPrefix(prefix.to_string())),
        Some(first) if first != SDK_PREFIX => Err(AnnotationError::ForeignPrefix {
            prefix: prefix.to_string(),
        }),
        Some(_) => Ok(elements),
    }
}

/// Join path elements with `.`
pub fn join_path<S: AsRef<str>>(elements: &[S]) -> String {
    join(elements, PATH_SEPARATOR)
}

/// Split a path into its non-empty `.`-separated elements
pub fn split_path(path: &str) -> Result<Vec<String>, AnnotationError> {
    let elements = split(path, PATH_SEPARATOR);
    if elements.is_empty() {
        return Err(AnnotationError::EmptyPath(path.to_string()));
    }
    Ok(elements)
}

/// Join an annotation path and its value
pub fn join_annotation(path: &str, value: &str) -> String {
    format!("{path}{VALUE_SEPARATOR}{value}")
}

/// Split an annotation into path and value
pub fn split_annotation(annotation: &str) -> Result<(String, String), AnnotationError> {
    let mut parts = annotation.split(VALUE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(path), Some(value), None) => Ok((path.to_string(), value.to_string())),
        _ => Err(AnnotationError::MalformedAnnotation(annotation.to_string())),
    }
}

fn join<S: AsRef<str>>(elements: &[S], sep: char) -> String {
    let joined = elements
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&sep.to_string());
    joined.trim_matches(sep).to_string()
}

fn split(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
