//! Descriptor annotation parsing
//!
//! Interprets `+operator-sdk:gen-csv:` comment tags found on Go types and
//! struct members.

use opsdk_gotypes::{extract_comment_tags, unquote};

use crate::annotations::{SDK_PREFIX, join_path, split_path};
use crate::error::{DescriptorError, Result};
use crate::model::{ApiResourceReference, SpecDescriptor};

/// Comment tag marker for CSV generation annotations
pub const CSV_GEN_PREFIX: &str = "+operator-sdk:gen-csv:";

const CRD_ELEMENT: &str = "customresourcedefinitions";

/// Which descriptor list a descriptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Spec,
    Status,
}

impl DescriptorKind {
    /// The serialized field name playing this role on a kind type
    pub fn field_name(self) -> &'static str {
        match self {
            DescriptorKind::Spec => "spec",
            DescriptorKind::Status => "status",
        }
    }

    /// The role of a kind type member serialized as `field`, if any
    pub fn for_field(field: &str) -> Option<Self> {
        [DescriptorKind::Spec, DescriptorKind::Status]
            .into_iter()
            .find(|kind| kind.field_name() == field)
    }
}

/// A spec or status descriptor under construction
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    /// Set by a `specDescriptors=true`/`statusDescriptors=true` annotation
    pub include: bool,
    pub path: String,
    pub display_name: String,
    pub description: String,
    pub x_descriptors: Vec<String>,
}

impl Descriptor {
    pub fn new(kind: DescriptorKind) -> Self {
        Self {
            kind,
            include: false,
            path: String::new(),
            display_name: String::new(),
            description: String::new(),
            x_descriptors: Vec::new(),
        }
    }

    pub fn into_spec_descriptor(self) -> SpecDescriptor {
        SpecDescriptor {
            path: self.path,
            display_name: self.display_name,
            description: self.description,
            x_descriptors: self.x_descriptors,
            value: None,
        }
    }
}

/// Everything the annotations in one comment block describe
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCrdDescriptions {
    /// Always a spec descriptor followed by a status descriptor
    pub descriptors: Vec<Descriptor>,
    pub display_name: String,
    pub resources: Vec<ApiResourceReference>,
}

/// Parse all CSV generation annotations in `comments`
pub fn parse_csv_gen_annotations<S: AsRef<str>>(comments: &[S]) -> Result<ParsedCrdDescriptions> {
    let mut spec = Descriptor::new(DescriptorKind::Spec);
    let mut status = Descriptor::new(DescriptorKind::Status);
    let mut display_name = String::new();
    let mut resources = Vec::new();

    for (path, values) in extract_comment_tags(CSV_GEN_PREFIX, comments) {
        let elements = split_path(&path)?;
        let (parent, children) = elements
            .split_first()
            .ok_or_else(|| DescriptorError::annotation(format!("empty annotation path {path}")))?;
        if parent != CRD_ELEMENT {
            return Err(DescriptorError::annotation(format!(
                "unsupported path element {parent}"
            )));
        }
        let first_value = values.first().map(String::as_str).unwrap_or_default();

        match children.first().map(String::as_str) {
            Some("specDescriptors") => parse_member_annotation(&mut spec, children, first_value)?,
            Some("statusDescriptors") => parse_member_annotation(&mut status, children, first_value)?,
            Some("displayName") => {
                display_name = unquote(first_value).map_err(|e| {
                    DescriptorError::annotation(format!(
                        "error unquoting displayName {first_value}: {e}"
                    ))
                })?;
            }
            Some("resources") => {
                for value in &values {
                    let resource = parse_resource(value).map_err(|e| {
                        DescriptorError::annotation(format!("error parsing resource {value}: {e}"))
                    })?;
                    resources.push(resource);
                }
            }
            Some(other) => {
                return Err(DescriptorError::annotation(format!(
                    "unsupported {parent} child path element {other}"
                )));
            }
            None => {
                return Err(DescriptorError::annotation(format!(
                    "missing {parent} child path element in {SDK_PREFIX} annotation"
                )));
            }
        }
    }

    Ok(ParsedCrdDescriptions {
        descriptors: vec![spec, status],
        display_name,
        resources,
    })
}

/// Apply one `specDescriptors`/`statusDescriptors` annotation to `descriptor`
fn parse_member_annotation(descriptor: &mut Descriptor, elements: &[String], value: &str) -> Result<()> {
    match elements {
        [selector] => {
            descriptor.include = parse_bool(value).ok_or_else(|| {
                DescriptorError::annotation(format!(
                    "error parsing {selector} bool val {value}: invalid syntax"
                ))
            })?;
        }
        [_, field] => match field.as_str() {
            "displayName" => {
                descriptor.display_name = unquote(value).map_err(|e| {
                    DescriptorError::annotation(format!(
                        "error unquoting field displayName {value}: {e}"
                    ))
                })?;
            }
            "x-descriptors" => {
                let joined = unquote(value).map_err(|e| {
                    DescriptorError::annotation(format!(
                        "error unquoting field x-descriptors {value}: {e}"
                    ))
                })?;
                descriptor.x_descriptors = joined.split(',').map(str::to_string).collect();
            }
            other => {
                return Err(DescriptorError::annotation(format!(
                    "unsupported descriptor path element {other}"
                )));
            }
        },
        _ => {
            return Err(DescriptorError::annotation(format!(
                "unsupported descriptor path {}",
                join_path(elements)
            )));
        }
    }
    Ok(())
}

/// Parse a resource string of the form `"Kind,version,\"name\""`
pub fn parse_resource(value: &str) -> Result<ApiResourceReference> {
    let unquoted = unquote(value).map_err(|e| {
        DescriptorError::annotation(format!("error unquoting resource {value}: {e}"))
    })?;

    let fields: Vec<&str> = unquoted.splitn(3, ',').collect();
    let [kind, version, rest @ ..] = fields.as_slice() else {
        return Err(DescriptorError::annotation(format!(
            "resource string {unquoted} did not have at least a kind and a version"
        )));
    };

    let mut resource = ApiResourceReference {
        name: String::new(),
        kind: kind.trim().to_string(),
        version: version.trim().to_string(),
    };
    if let Some(name) = rest.first() {
        resource.name = unquote(name)
            .map_err(|e| {
                DescriptorError::annotation(format!("error unquoting resource name {name}: {e}"))
            })?
            .trim()
            .to_string();
    }
    Ok(resource)
}

/// Join comment lines into one line, dropping tool directives
pub fn parse_description<S: AsRef<str>>(comments: &[S]) -> String {
    comments
        .iter()
        .map(|c| c.as_ref().trim_start_matches('/').trim())
        .filter(|l| !l.is_empty() && !l.starts_with('+'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Boolean literals as Go's `strconv.ParseBool` accepts them
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(rest: &str) -> String {
        format!("{CSV_GEN_PREFIX}{rest}")
    }

    #[test]
    fn test_descriptor_kind_for_field() {
        assert_eq!(DescriptorKind::for_field("spec"), Some(DescriptorKind::Spec));
        assert_eq!(DescriptorKind::for_field("status"), Some(DescriptorKind::Status));
        assert_eq!(DescriptorKind::for_field("metadata"), None);
        assert_eq!(DescriptorKind::for_field("Spec"), None);
    }

    #[test]
    fn test_parse_member_annotations() {
        let comments = [
            "Size is the size of the deployment".to_string(),
            tag("customresourcedefinitions.specDescriptors=true"),
            tag("customresourcedefinitions.specDescriptors.displayName=\"dummy-pods\""),
            tag("customresourcedefinitions.specDescriptors.x-descriptors=\"urn:a,urn:b\""),
            tag("customresourcedefinitions.statusDescriptors.displayName=\"ignored\""),
        ];

        let parsed = parse_csv_gen_annotations(&comments).unwrap();
        let [spec, status] = parsed.descriptors.as_slice() else {
            panic!("expected spec and status descriptors");
        };
        assert_eq!(spec.kind, DescriptorKind::Spec);
        assert!(spec.include);
        assert_eq!(spec.display_name, "dummy-pods");
        assert_eq!(spec.x_descriptors, vec!["urn:a", "urn:b"]);
        assert!(!status.include);
        assert_eq!(status.display_name, "ignored");
    }

    #[test]
    fn test_parse_type_annotations() {
        let comments = [
            tag("customresourcedefinitions.displayName=\"Dummy App\""),
            tag(r#"customresourcedefinitions.resources="Deployment,v1,\"dummy-deployment\"""#),
            tag(r#"customresourcedefinitions.resources="Pod,v1""#),
        ];

        let parsed = parse_csv_gen_annotations(&comments).unwrap();
        assert_eq!(parsed.display_name, "Dummy App");
        assert_eq!(
            parsed.resources,
            vec![
                ApiResourceReference {
                    name: "dummy-deployment".into(),
                    kind: "Deployment".into(),
                    version: "v1".into(),
                },
                ApiResourceReference {
                    name: String::new(),
                    kind: "Pod".into(),
                    version: "v1".into(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("foo.specDescriptors=true", "unsupported path element foo"),
            (
                "customresourcedefinitions.actionDescriptors=true",
                "unsupported customresourcedefinitions child path element actionDescriptors",
            ),
            (
                "customresourcedefinitions.specDescriptors=yes",
                "error parsing specDescriptors bool val yes: invalid syntax",
            ),
            (
                "customresourcedefinitions.specDescriptors.path=\"x\"",
                "unsupported descriptor path element path",
            ),
            (
                "customresourcedefinitions.specDescriptors.a.b=\"x\"",
                "unsupported descriptor path specDescriptors.a.b",
            ),
            (
                "customresourcedefinitions.displayName=unquoted",
                "error unquoting displayName unquoted: invalid syntax",
            ),
        ];

        for (annotation, message) in cases {
            let err = parse_csv_gen_annotations(&[tag(annotation)]).unwrap_err();
            assert_eq!(err.to_string(), message, "annotation {annotation}");
        }
    }

    #[test]
    fn test_parse_resource() {
        let resource = parse_resource(r#""Memcached,v1,\"memcached.example.com\"""#).unwrap();
        assert_eq!(resource.kind, "Memcached");
        assert_eq!(resource.version, "v1");
        assert_eq!(resource.name, "memcached.example.com");

        let resource = parse_resource(r#"" Memcached , v1 ""#).unwrap();
        assert_eq!(resource.kind, "Memcached");
        assert_eq!(resource.version, "v1");

        let err = parse_resource(r#""Memcached""#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "resource string Memcached did not have at least a kind and a version"
        );
        assert!(parse_resource(r#""Memcached,v1,unquoted""#).is_err());
        assert!(parse_resource("Memcached,v1").is_err());
    }

    #[test]
    fn test_parse_description() {
        let comments = [
            "// Dummy is the Schema",
            "   for the dummy API  ",
            "",
            "+k8s:openapi-gen=true",
            "//+operator-sdk:gen-csv:customresourcedefinitions.displayName=\"x\"",
        ];
        assert_eq!(parse_description(&comments), "Dummy is the Schema for the dummy API");
    }

    #[test]
    fn test_no_annotations() {
        let parsed = parse_csv_gen_annotations(&["just a comment"]).unwrap();
        assert_eq!(parsed.descriptors.len(), 2);
        assert!(parsed.descriptors.iter().all(|d| !d.include));
        assert!(parsed.display_name.is_empty());
        assert!(parsed.resources.is_empty());
    }
}
