//! Type tree walking
//!
//! Starting from a root type, every reachable struct member is visited
//! breadth first. Each visited member records the serialized path segments
//! leading to it from the root, and members carrying CSV annotations are
//! kept for descriptor resolution.

use std::collections::VecDeque;

use opsdk_gotypes::{LiteralError, Member, Package, ResolvedKey, TypeExpr, Universe, parse_struct_tags};

use crate::error::{DescriptorError, Result};
use crate::parse::CSV_GEN_PREFIX;

/// How a struct member contributes to a serialized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Named(String),
    /// The member's fields serialize into its parent
    Inlined,
    /// The member is not serialized at all
    Ignored,
}

impl PathSegment {
    pub fn name(&self) -> Option<&str> {
        match self {
            PathSegment::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// Serialized path segment for a struct member
///
/// Embedded members are inlined and unexported members ignored; otherwise
/// the `json` tag decides, falling back to the field name like
/// `encoding/json` does.
pub fn path_segment(member: &Member) -> std::result::Result<PathSegment, LiteralError> {
    if member.embedded {
        return Ok(PathSegment::Inlined);
    }
    if !is_exported(&member.name) {
        return Ok(PathSegment::Ignored);
    }

    let tags = parse_struct_tags(&member.tags)?;
    if let Some(json) = tags.iter().find(|t| t.key == "json") {
        if json.has_option("inline") {
            return Ok(PathSegment::Inlined);
        }
        if json.name == "-" {
            if json.options.is_empty() {
                return Ok(PathSegment::Ignored);
            }
            return Ok(PathSegment::Named(json.name.clone()));
        }
        if !json.name.is_empty() {
            return Ok(PathSegment::Named(json.name.clone()));
        }
    }
    Ok(PathSegment::Named(member.name.clone()))
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| !c.is_lowercase())
}

/// A member found during the walk, with its path from the root
#[derive(Debug, Clone)]
pub struct TreeNode<'a> {
    pub member: &'a Member,
    pub segments: Vec<PathSegment>,
}

/// Annotated members reachable from a root type
#[derive(Debug, Clone)]
pub struct TypeTree<'a> {
    annotated: Vec<TreeNode<'a>>,
    visited: usize,
}

struct Pending<'a> {
    ty: &'a TypeExpr,
    scope: &'a Package,
    label: String,
    segments: Vec<PathSegment>,
    ancestors: Vec<ResolvedKey<'a>>,
}

impl<'a> TypeTree<'a> {
    /// Walk every member reachable from `root`, declared in `scope`
    ///
    /// A named struct already on the current branch is not expanded again,
    /// so self-referential types terminate.
    pub fn from_root(universe: &'a Universe, scope: &'a Package, root: &'a TypeExpr) -> Result<Self> {
        let mut tree = TypeTree {
            annotated: Vec::new(),
            visited: 0,
        };
        let mut queue = VecDeque::from([Pending {
            ty: root,
            scope,
            label: root.to_string(),
            segments: Vec::new(),
            ancestors: Vec::new(),
        }]);

        while let Some(parent) = queue.pop_front() {
            let Some(resolved) = universe.members_of(parent.scope, parent.ty) else {
                continue;
            };

            let mut ancestors = parent.ancestors.clone();
            if let Some(key) = resolved.key {
                if ancestors.contains(&key) {
                    tracing::trace!(type_key = %key, "not expanding recursive type");
                    continue;
                }
                ancestors.push(key);
            }

            for member in resolved.members {
                let segment = path_segment(member).map_err(|source| DescriptorError::MemberTags {
                    type_name: parent.label.clone(),
                    member: member.name.clone(),
                    source,
                })?;
                let segments = child_segments(&parent, segment);
                tree.visited += 1;

                if has_annotations(member) {
                    tree.annotated.push(TreeNode {
                        member,
                        segments: segments.clone(),
                    });
                }

                queue.push_back(Pending {
                    ty: &member.ty,
                    scope: resolved.package,
                    label: member.ty.to_string(),
                    segments,
                    ancestors: ancestors.clone(),
                });
            }
        }

        Ok(tree)
    }

    /// Annotated members in breadth-first order
    pub fn annotated(&self) -> &[TreeNode<'a>] {
        &self.annotated
    }

    /// Number of members visited during the walk
    pub fn visited(&self) -> usize {
        self.visited
    }
}

/// Parent segments plus `segment`; list parents get an `[0]` index
fn child_segments(parent: &Pending<'_>, segment: PathSegment) -> Vec<PathSegment> {
    let mut segments = parent.segments.clone();
    if parent.ty.is_list() {
        if let Some(PathSegment::Named(name)) = segments.last_mut() {
            name.push_str("[0]");
        }
    }
    segments.push(segment);
    segments
}

fn has_annotations(member: &Member) -> bool {
    member
        .comment_lines
        .iter()
        .any(|l| l.trim_matches(' ').starts_with(CSV_GEN_PREFIX))
}
