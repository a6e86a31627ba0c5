//! YAML manifest helpers
//!
//! Kubernetes manifests on disk are multi-document YAML streams. These
//! helpers split them into single documents and sniff the `apiVersion`/`kind`
//! pair used to route each document.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const DOCUMENT_SEPARATOR: &str = "---";

/// The `apiVersion`/`kind` pair of a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMeta {
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}

impl TypeMeta {
    /// API group, empty for the core group (`v1`)
    pub fn group(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    /// API version without the group
    pub fn version(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((_, version)) => version,
            None => &self.api_version,
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(self.group(), self.version(), &self.kind)
    }
}

/// Identity of a Kubernetes API type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

impl std::fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Kind={}", self.version, self.kind)
        } else {
            write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
        }
    }
}

/// Split a multi-document YAML stream into its documents
///
/// Documents that hold nothing but whitespace or comments are dropped.
pub fn split_documents(content: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if is_separator(line) {
            push_document(&mut documents, std::mem::take(&mut current));
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    push_document(&mut documents, current);

    documents
}

fn is_separator(line: &str) -> bool {
    match line.strip_prefix(DOCUMENT_SEPARATOR) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

fn push_document(documents: &mut Vec<String>, document: String) {
    let has_content = document.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    });
    if has_content {
        documents.push(document);
    }
}

/// Read the type metadata of a single manifest document
pub fn type_meta_from_bytes(document: &str) -> Result<TypeMeta> {
    let value: serde_yaml::Value = serde_yaml::from_str(document)?;
    if !value.is_mapping() {
        return Err(CoreError::TypeMeta {
            message: "manifest is not a YAML mapping".to_string(),
        });
    }
    let meta: TypeMeta = serde_yaml::from_value(value)?;
    if meta.kind.is_empty() {
        return Err(CoreError::TypeMeta {
            message: "object has no kind".to_string(),
        });
    }
    Ok(meta)
}
