//! Descriptor resolution
//!
//! Turns the annotated members of a [`TypeTree`] into spec or status
//! descriptors with full paths, display names, descriptions and UI hints.

use std::collections::BTreeSet;

use opsdk_core::display_name;
use phf::phf_map;

use crate::error::Result;
use crate::parse::{Descriptor, DescriptorKind, parse_csv_gen_annotations, parse_description};
use crate::tree::{PathSegment, TreeNode, TypeTree};

// =============================================================================
// X-DESCRIPTOR CONVENTIONS - path element to console UI hint
// =============================================================================

static SPEC_X_DESCRIPTORS: phf::Map<&'static str, &'static str> = phf_map! {
    "size" => "urn:alm:descriptor:com.tectonic.ui:podCount",
    "podCount" => "urn:alm:descriptor:com.tectonic.ui:podCount",
    "endpoints" => "urn:alm:descriptor:com.tectonic.ui:endpointList",
    "endpointList" => "urn:alm:descriptor:com.tectonic.ui:endpointList",
    "label" => "urn:alm:descriptor:com.tectonic.ui:label",
    "resources" => "urn:alm:descriptor:com.tectonic.ui:resourceRequirements",
    "resourceRequirements" => "urn:alm:descriptor:com.tectonic.ui:resourceRequirements",
    "selector" => "urn:alm:descriptor:com.tectonic.ui:selector:",
    "namespaceSelector" => "urn:alm:descriptor:com.tectonic.ui:namespaceSelector",
    "booleanSwitch" => "urn:alm:descriptor:com.tectonic.ui:booleanSwitch",

    // Form inputs
    "password" => "urn:alm:descriptor:com.tectonic.ui:password",
    "checkbox" => "urn:alm:descriptor:com.tectonic.ui:checkbox",
    "imagePullPolicy" => "urn:alm:descriptor:com.tectonic.ui:imagePullPolicy",
    "updateStrategy" => "urn:alm:descriptor:com.tectonic.ui:updateStrategy",
    "text" => "urn:alm:descriptor:com.tectonic.ui:text",
    "number" => "urn:alm:descriptor:com.tectonic.ui:number",
    "nodeAffinity" => "urn:alm:descriptor:com.tectonic.ui:nodeAffinity",
    "podAffinity" => "urn:alm:descriptor:com.tectonic.ui:podAffinity",
    "podAntiAffinity" => "urn:alm:descriptor:com.tectonic.ui:podAntiAffinity",
    "advanced" => "urn:alm:descriptor:com.tectonic.ui:advanced",
};

static STATUS_X_DESCRIPTORS: phf::Map<&'static str, &'static str> = phf_map! {
    "podStatuses" => "urn:alm:descriptor:com.tectonic.ui:podStatuses",
    "size" => "urn:alm:descriptor:com.tectonic.ui:podCount",
    "podCount" => "urn:alm:descriptor:com.tectonic.ui:podCount",
    "link" => "urn:alm:descriptor:org.w3:link",
    "w3link" => "urn:alm:descriptor:org.w3:link",
    "conditions" => "urn:alm:descriptor:io.kubernetes.conditions",
    "text" => "urn:alm:descriptor:text",
    "prometheusEndpoint" => "urn:alm:descriptor:prometheusEndpoint",
    "phase" => "urn:alm:descriptor:io.kubernetes.phase",
    "k8sPhase" => "urn:alm:descriptor:io.kubernetes.phase",
    "reason" => "urn:alm:descriptor:io.kubernetes.phase:reason",
    "k8sReason" => "urn:alm:descriptor:io.kubernetes.phase:reason",
};

/// Merge `existing` hints with those implied by the elements of `path`,
/// deduplicated and sorted
pub fn x_descriptors_by_path(kind: DescriptorKind, existing: &[String], path: &str) -> Vec<String> {
    let table = match kind {
        DescriptorKind::Spec => &SPEC_X_DESCRIPTORS,
        DescriptorKind::Status => &STATUS_X_DESCRIPTORS,
    };

    let mut xdescs: BTreeSet<String> = existing.iter().cloned().collect();
    xdescs.extend(
        path.split('.')
            .filter_map(|element| table.get(element))
            .map(|urn| urn.to_string()),
    );
    xdescs.into_iter().collect()
}

/// Sort descriptors by path; equal paths keep their order
pub fn sort_descriptors(descriptors: &mut [Descriptor]) {
    descriptors.sort_by(|a, b| a.path.cmp(&b.path));
}

/// Dotted path for a node, or `None` when the member is not addressable
///
/// Any ignored segment drops the member. Inlined segments are skipped, but
/// a member that is itself inlined has no path of its own.
pub fn resolve_path(segments: &[PathSegment]) -> Option<String> {
    let last = segments.len().saturating_sub(1);
    let mut has_inline = false;
    let mut include_inlined = false;
    let mut names = Vec::with_capacity(segments.len());

    for (idx, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::Ignored => return None,
            PathSegment::Inlined => {
                has_inline = true;
                include_inlined = include_inlined || idx < last;
            }
            PathSegment::Named(name) => names.push(name.as_str()),
        }
    }

    if has_inline && !include_inlined {
        return None;
    }
    Some(names.join(".").trim_matches('.').to_string())
}

impl TypeTree<'_> {
    /// Descriptors of `kind` for every annotated member, sorted by path
    pub fn descriptors_for(&self, kind: DescriptorKind) -> Result<Vec<Descriptor>> {
        let mut descriptors = Vec::new();

        for node in self.annotated() {
            let parsed = parse_csv_gen_annotations(&node.member.comment_lines)?;
            for descriptor in parsed.descriptors {
                if !descriptor.include || descriptor.kind != kind {
                    continue;
                }
                if let Some(resolved) = resolve_descriptor(node, descriptor) {
                    descriptors.push(resolved);
                }
            }
        }

        sort_descriptors(&mut descriptors);
        Ok(descriptors)
    }
}

fn resolve_descriptor(node: &TreeNode<'_>, mut descriptor: Descriptor) -> Option<Descriptor> {
    descriptor.path = resolve_path(&node.segments)?;
    if descriptor.display_name.is_empty() {
        descriptor.display_name = display_name(&node.member.name);
    }
    descriptor.description = parse_description(&node.member.comment_lines);
    descriptor.x_descriptors =
        x_descriptors_by_path(descriptor.kind, &descriptor.x_descriptors, &descriptor.path);
    Some(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdk_gotypes::{Package, TypeExpr, Universe, parser};

    fn named(name: &str) -> PathSegment {
        PathSegment::Named(name.to_string())
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path(&[named("hog"), named("engine")]).as_deref(), Some("hog.engine"));
        assert_eq!(
            resolve_path(&[named("hog"), PathSegment::Inlined, named("seatMaterial")]).as_deref(),
            Some("hog.seatMaterial")
        );
        assert_eq!(resolve_path(&[named("hog"), PathSegment::Inlined]), None);
        assert_eq!(resolve_path(&[named("hog"), PathSegment::Ignored, named("x")]), None);
        assert_eq!(resolve_path(&[PathSegment::Inlined, named("a"), PathSegment::Inlined]).as_deref(), Some("a"));
    }

    #[test]
    fn test_x_descriptors_by_path() {
        let existing = vec!["urn:alm:descriptor:com.tectonic.ui:podCount".to_string()];
        assert_eq!(
            x_descriptors_by_path(DescriptorKind::Spec, &existing, "size"),
            existing
        );
        assert_eq!(
            x_descriptors_by_path(DescriptorKind::Spec, &[], "config.password"),
            vec!["urn:alm:descriptor:com.tectonic.ui:password"]
        );
        assert_eq!(
            x_descriptors_by_path(DescriptorKind::Status, &[], "conditions"),
            vec!["urn:alm:descriptor:io.kubernetes.conditions"]
        );
        assert!(x_descriptors_by_path(DescriptorKind::Status, &[], "password").is_empty());
        assert!(x_descriptors_by_path(DescriptorKind::Spec, &[], "wheels[0].size[0]").is_empty());
    }

    #[test]
    fn test_sort_descriptors_idempotent() {
        let mut descriptors: Vec<Descriptor> = ["b", "a.c", "a", "b"]
            .iter()
            .map(|p| Descriptor {
                path: p.to_string(),
                ..Descriptor::new(DescriptorKind::Spec)
            })
            .collect();

        sort_descriptors(&mut descriptors);
        let once: Vec<_> = descriptors.iter().map(|d| d.path.clone()).collect();
        sort_descriptors(&mut descriptors);
        let twice: Vec<_> = descriptors.iter().map(|d| d.path.clone()).collect();

        assert_eq!(once, vec!["a", "a.c", "b", "b"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_descriptors_for_tree() {
        let src = r#"package v1

type Status struct {
	// Current phase of the app
	// +operator-sdk:gen-csv:customresourcedefinitions.statusDescriptors=true
	Phase string `json:"phase"`
	// +operator-sdk:gen-csv:customresourcedefinitions.specDescriptors=true
	OnlySpec string `json:"onlySpec"`
	// +operator-sdk:gen-csv:customresourcedefinitions.statusDescriptors=true
	// +operator-sdk:gen-csv:customresourcedefinitions.statusDescriptors.displayName="Pods"
	PodStatuses []string `json:"podStatuses"`
}
"#;
        let pkg = Package::new("apis/v1", "v1").with_file(parser::parse(src).unwrap());
        let universe = Universe::new(vec![pkg]);
        let pkg = universe.packages().next().unwrap();
        let root = TypeExpr::named("Status");
        let tree = TypeTree::from_root(&universe, pkg, &root).unwrap();

        let status = tree.descriptors_for(DescriptorKind::Status).unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].path, "phase");
        assert_eq!(status[0].display_name, "Phase");
        assert_eq!(status[0].description, "Current phase of the app");
        assert_eq!(status[0].x_descriptors, vec!["urn:alm:descriptor:io.kubernetes.phase"]);
        assert_eq!(status[1].path, "podStatuses");
        assert_eq!(status[1].display_name, "Pods");

        let spec = tree.descriptors_for(DescriptorKind::Spec).unwrap();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0].path, "onlySpec");
        assert_eq!(spec[0].display_name, "Only Spec");
    }
}
