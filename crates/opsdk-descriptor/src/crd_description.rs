//! CRD description assembly
//!
//! Builds the `spec.customresourcedefinitions.owned` entry for one API by
//! reading the Go package that declares its kind type.

use std::path::{Path, PathBuf};

use opsdk_core::{FileSystem, GroupVersionKind};
use opsdk_gotypes::{GoSourceIndexer, Package, TypeExpr, TypeUniverseProvider, Universe};

use crate::error::{DescriptorError, Result};
use crate::model::CrdDescription;
use crate::parse::{Descriptor, DescriptorKind, parse_csv_gen_annotations, parse_description};
use crate::tree::{PathSegment, TypeTree, path_segment};

/// Describe the API identified by `gvk` from the Go sources under `apis_dir`
pub fn crd_description_for_gvk(
    fs: &dyn FileSystem,
    apis_dir: &Path,
    gvk: &GroupVersionKind,
) -> Result<CrdDescription> {
    crd_description_with(&GoSourceIndexer::new(fs), fs, apis_dir, gvk)
}

/// Same as [`crd_description_for_gvk`] with an explicit type provider
pub fn crd_description_with(
    provider: &dyn TypeUniverseProvider,
    fs: &dyn FileSystem,
    apis_dir: &Path,
    gvk: &GroupVersionKind,
) -> Result<CrdDescription> {
    let mut description = CrdDescription {
        version: gvk.version.clone(),
        kind: gvk.kind.clone(),
        ..Default::default()
    };

    if !fs.is_dir(apis_dir) {
        tracing::debug!(dir = %apis_dir.display(), "could not find API types directory");
        return Err(DescriptorError::ApiDirNotExist(apis_dir.to_path_buf()));
    }

    let universe = load_api_universe(provider, fs, apis_dir, gvk)?;
    let pkg = match expected_package_dir(fs, apis_dir, gvk) {
        Some(dir) => universe
            .package(&dir)
            .ok_or_else(|| DescriptorError::PackageNotFound(dir.display().to_string()))?,
        None => find_kind_package(&universe, &gvk.kind, &gvk.version)
            .or_else(|| universe.package_named(&gvk.version))
            .ok_or_else(|| DescriptorError::PackageNotFound(gvk.version.clone()))?,
    };

    let kind_decl = pkg.get(&gvk.kind).ok_or_else(|| DescriptorError::ApiTypeNotFound {
        kind: gvk.kind.clone(),
    })?;

    let comments: Vec<&String> = kind_decl
        .second_closest_comment_lines
        .iter()
        .chain(&kind_decl.comment_lines)
        .collect();
    let kind_annotations =
        parse_csv_gen_annotations(&comments).map_err(|e| DescriptorError::TypeAnnotations {
            type_name: kind_decl.name.clone(),
            source: Box::new(e),
        })?;

    description.description = parse_description(&comments);
    description.display_name = kind_annotations.display_name;
    description.resources = kind_annotations.resources;
    description.resources.sort_by(|a, b| a.kind.cmp(&b.kind));

    let kind_ty = TypeExpr::named(gvk.kind.as_str());
    let Some(kind_members) = universe.members_of(pkg, &kind_ty) else {
        return Ok(description);
    };

    for member in kind_members.members {
        let segment = path_segment(member).map_err(|source| DescriptorError::MemberTags {
            type_name: gvk.kind.clone(),
            member: member.name.clone(),
            source,
        })?;
        let PathSegment::Named(name) = segment else {
            continue;
        };
        let Some(role) = DescriptorKind::for_field(&name) else {
            continue;
        };

        let tree = TypeTree::from_root(&universe, kind_members.package, &member.ty)?;
        let descriptors = tree.descriptors_for(role)?;
        let converted = descriptors.into_iter().map(Descriptor::into_spec_descriptor);
        match role {
            DescriptorKind::Spec => description.spec_descriptors.extend(converted),
            DescriptorKind::Status => description.status_descriptors.extend(converted),
        }
    }

    Ok(description)
}

/// Package directory for the multi-group (`<apis>/<group>/<version>`) or
/// single-group (`<apis>/<version>`) layout, if either exists
pub fn expected_package_dir(fs: &dyn FileSystem, apis_dir: &Path, gvk: &GroupVersionKind) -> Option<PathBuf> {
    let group = short_group(&gvk.group);

    let multi_group = apis_dir.join(group).join(&gvk.version);
    if !group.is_empty() && fs.is_dir(&multi_group) {
        return Some(multi_group);
    }
    let single_group = apis_dir.join(&gvk.version);
    if fs.is_dir(&single_group) {
        return Some(single_group);
    }
    None
}

/// Index the expected package directory, or the whole API tree when the
/// layout is not a conventional one
fn load_api_universe(
    provider: &dyn TypeUniverseProvider,
    fs: &dyn FileSystem,
    apis_dir: &Path,
    gvk: &GroupVersionKind,
) -> Result<Universe> {
    let dir = match expected_package_dir(fs, apis_dir, gvk) {
        Some(dir) => dir,
        None => {
            tracing::debug!(
                dir = %apis_dir.display(),
                version = %gvk.version,
                "unknown API layout, searching for package by version"
            );
            apis_dir.to_path_buf()
        }
    };
    Ok(provider.list_packages(&dir)?)
}

/// `cache.example.com` becomes `cache`
fn short_group(group: &str) -> &str {
    group.split('.').next().unwrap_or(group)
}

/// First package named `version` that declares `kind`
pub fn find_kind_package<'a>(universe: &'a Universe, kind: &str, version: &str) -> Option<&'a Package> {
    universe
        .packages()
        .find(|p| p.name == version && p.get(kind).is_some())
}
