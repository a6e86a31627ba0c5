//! `csv-config.yaml`: where the generator finds its input manifests
//!
//! ```yaml
//! operator-path: deploy/operator.yaml
//! role-paths:
//!   - deploy/role.yaml
//! crd-cr-paths:
//!   - deploy/crds
//! ```
//!
//! Every key is optional. Relative paths are resolved against the project
//! directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use opsdk_core::FileSystem;
use serde::{Deserialize, Serialize};

use crate::error::{CsvError, Result};

pub const CSV_CONFIG_FILE: &str = "csv-config.yaml";
pub const DEFAULT_OPERATOR_PATH: &str = "deploy/operator.yaml";
pub const DEFAULT_ROLE_PATH: &str = "deploy/role.yaml";
pub const DEFAULT_CRDS_DIR: &str = "deploy/crds";

const YAML_EXT: &str = "yaml";

/// The config file as written by users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CsvConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_path: Option<PathBuf>,

    /// Legacy single role path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_paths: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crd_cr_paths: Vec<PathBuf>,
}

/// Resolved manifest locations, in scan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvConfig {
    pub operator_path: PathBuf,
    pub role_paths: Vec<PathBuf>,
    pub crd_cr_paths: Vec<PathBuf>,
}

impl CsvConfig {
    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(fs: &dyn FileSystem, project_dir: &Path, path: &Path) -> Result<Self> {
        let path = project_dir.join(path);
        let file = if fs.exists(&path) {
            let content = fs.read_to_string(&path)?;
            if content.trim().is_empty() {
                CsvConfigFile::default()
            } else {
                serde_yaml::from_str(&content).map_err(|source| CsvError::ConfigParse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            tracing::debug!(path = %path.display(), "no CSV config file, using defaults");
            CsvConfigFile::default()
        };
        Self::resolve(fs, project_dir, file)
    }

    /// Apply defaults and expand directories
    ///
    /// Paths named in the file must exist. Default paths that are missing are
    /// dropped, since a project need not have every kind of manifest.
    pub fn resolve(fs: &dyn FileSystem, project_dir: &Path, file: CsvConfigFile) -> Result<Self> {
        let operator_path = match file.operator_path {
            Some(p) => require(fs, project_dir.join(p))?,
            None => project_dir.join(DEFAULT_OPERATOR_PATH),
        };

        let mut role_paths = Vec::new();
        for p in file.role_paths.into_iter().chain(file.role_path) {
            let p = require(fs, project_dir.join(p))?;
            if !role_paths.contains(&p) {
                role_paths.push(p);
            }
        }
        if role_paths.is_empty() {
            role_paths.push(project_dir.join(DEFAULT_ROLE_PATH));
        }

        let crd_cr_paths = if file.crd_cr_paths.is_empty() {
            let crds_dir = project_dir.join(DEFAULT_CRDS_DIR);
            if fs.is_dir(&crds_dir) {
                manifest_paths_in(fs, &crds_dir)?
            } else {
                Vec::new()
            }
        } else {
            let mut paths = Vec::new();
            let mut seen = HashSet::new();
            for p in file.crd_cr_paths {
                let p = require(fs, project_dir.join(p))?;
                let found = if fs.is_dir(&p) {
                    manifest_paths_in(fs, &p)?
                } else if is_yaml_file(&p) {
                    vec![p]
                } else {
                    Vec::new()
                };
                for f in found {
                    if seen.insert(f.clone()) {
                        paths.push(f);
                    }
                }
            }
            paths
        };

        Ok(Self {
            operator_path,
            role_paths,
            crd_cr_paths,
        })
    }

    /// Every manifest to scan: CRDs and CRs, then the operator, then roles
    ///
    /// Paths that do not exist are skipped.
    pub fn manifest_paths(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        self.crd_cr_paths
            .iter()
            .chain(std::iter::once(&self.operator_path))
            .chain(&self.role_paths)
            .filter(|p| {
                let exists = fs.exists(p);
                if !exists {
                    tracing::debug!(path = %p.display(), "manifest not found, skipping");
                }
                exists
            })
            .cloned()
            .collect()
    }
}

fn require(fs: &dyn FileSystem, path: PathBuf) -> Result<PathBuf> {
    if fs.exists(&path) {
        Ok(path)
    } else {
        Err(CsvError::ConfigPathNotFound(path))
    }
}

/// `.yaml` files below `dir`, recursively, in sorted order
pub fn manifest_paths_in(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs
        .walk_files(dir)?
        .into_iter()
        .filter(|p| is_yaml_file(p))
        .collect())
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == YAML_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdk_core::MemFileSystem;

    fn project() -> MemFileSystem {
        MemFileSystem::new().with_files([
            ("proj/deploy/operator.yaml", "kind: Deployment"),
            ("proj/deploy/role.yaml", "kind: Role"),
            ("proj/deploy/crds/cache_v1alpha1_memcached_crd.yaml", "kind: CustomResourceDefinition"),
            ("proj/deploy/crds/cache_v1alpha1_memcached_cr.yaml", "kind: Memcached"),
            ("proj/deploy/crds/README.md", "# crds"),
            ("proj/deploy/extra/cluster_role.yaml", "kind: ClusterRole"),
        ])
    }

    #[test]
    fn test_defaults_without_config_file() {
        let fs = project();
        let cfg = CsvConfig::load(&fs, Path::new("proj"), Path::new("deploy/olm-catalog/csv-config.yaml"))
            .unwrap();

        assert_eq!(cfg.operator_path, PathBuf::from("proj/deploy/operator.yaml"));
        assert_eq!(cfg.role_paths, vec![PathBuf::from("proj/deploy/role.yaml")]);
        assert_eq!(
            cfg.crd_cr_paths,
            vec![
                PathBuf::from("proj/deploy/crds/cache_v1alpha1_memcached_cr.yaml"),
                PathBuf::from("proj/deploy/crds/cache_v1alpha1_memcached_crd.yaml"),
            ]
        );
    }

    #[test]
    fn test_config_file_paths() {
        let fs = project().with_text_file(
            "proj/deploy/olm-catalog/csv-config.yaml",
            r#"
role-path: deploy/role.yaml
role-paths:
  - deploy/extra/cluster_role.yaml
crd-cr-paths:
  - deploy/crds/cache_v1alpha1_memcached_crd.yaml
  - deploy/crds
  - deploy/crds/README.md
"#,
        );
        let cfg = CsvConfig::load(&fs, Path::new("proj"), Path::new("deploy/olm-catalog/csv-config.yaml"))
            .unwrap();

        assert_eq!(
            cfg.role_paths,
            vec![
                PathBuf::from("proj/deploy/extra/cluster_role.yaml"),
                PathBuf::from("proj/deploy/role.yaml"),
            ]
        );
        assert_eq!(
            cfg.crd_cr_paths,
            vec![
                PathBuf::from("proj/deploy/crds/cache_v1alpha1_memcached_crd.yaml"),
                PathBuf::from("proj/deploy/crds/cache_v1alpha1_memcached_cr.yaml"),
            ]
        );
    }

    #[test]
    fn test_missing_configured_path() {
        let fs = project().with_text_file(
            "proj/deploy/olm-catalog/csv-config.yaml",
            "operator-path: deploy/missing.yaml\n",
        );
        let err = CsvConfig::load(&fs, Path::new("proj"), Path::new("deploy/olm-catalog/csv-config.yaml"))
            .unwrap_err();

        assert!(matches!(err, CsvError::ConfigPathNotFound(ref p) if p.ends_with("deploy/missing.yaml")));
    }

    #[test]
    fn test_bad_config_file() {
        let fs = project().with_text_file("proj/csv-config.yaml", "role-paths: 3\n");
        let err = CsvConfig::load(&fs, Path::new("proj"), Path::new("csv-config.yaml")).unwrap_err();
        assert!(matches!(err, CsvError::ConfigParse { .. }));
    }

    #[test]
    fn test_manifest_paths_skip_missing_defaults() {
        let fs = MemFileSystem::new().with_text_file("proj/deploy/operator.yaml", "kind: Deployment");
        let cfg = CsvConfig::load(&fs, Path::new("proj"), Path::new("csv-config.yaml")).unwrap();

        assert!(cfg.crd_cr_paths.is_empty());
        assert_eq!(cfg.manifest_paths(&fs), vec![PathBuf::from("proj/deploy/operator.yaml")]);
    }
}
