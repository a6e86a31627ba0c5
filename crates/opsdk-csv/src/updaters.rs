//! CSV updaters
//!
//! Manifests found during a scan are collected into an [`UpdaterStore`],
//! grouped by what they change in the CSV. A single [`UpdaterStore::apply`]
//! then runs every updater against the CSV:
//! - `InstallStrategyUpdate`: permissions, cluster permissions and deployments
//! - `OwnedCrdsUpdate`: `spec.customresourcedefinitions.owned`
//! - `AlmExamplesUpdate`: the `alm-examples` annotation

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexSet;
use opsdk_core::{FileSystem, GroupVersionKind};
use opsdk_descriptor::{CrdDescription, crd_description_for_gvk};

use crate::error::{CsvError, Result};
use crate::manifests::{CrdManifest, DeploymentManifest, OLM_TARGET_NAMESPACES, RoleManifest, decode};
use crate::types::{
    ALM_EXAMPLES_ANNOTATION, ClusterServiceVersion, INSTALL_STRATEGY_DEPLOYMENT, StrategyDeploymentPermissions,
    StrategyDeploymentSpec,
};

/// Something the generator can write into a CSV
pub trait CsvUpdater {
    /// Apply the collected data to `csv`
    fn apply(&self, csv: &mut ClusterServiceVersion) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Install strategy parts gathered from Role, ClusterRole and Deployment
/// manifests
///
/// Each list replaces the CSV's list wholesale, but only when at least one
/// manifest of that kind was found.
#[derive(Debug, Clone, Default)]
pub struct InstallStrategyUpdate {
    pub permissions: Vec<StrategyDeploymentPermissions>,
    pub cluster_permissions: Vec<StrategyDeploymentPermissions>,
    pub deployments: Vec<StrategyDeploymentSpec>,
}

impl CsvUpdater for InstallStrategyUpdate {
    fn apply(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        let install = &mut csv.spec.install;
        if install.strategy.is_empty() {
            install.strategy = INSTALL_STRATEGY_DEPLOYMENT.to_string();
            install.spec = Default::default();
        } else if install.strategy != INSTALL_STRATEGY_DEPLOYMENT {
            return Err(CsvError::UnknownInstallStrategy(install.strategy.clone()));
        }

        let strategy = &mut install.spec;
        if !self.permissions.is_empty() {
            strategy.permissions = self.permissions.clone();
        }
        if !self.cluster_permissions.is_empty() {
            strategy.cluster_permissions = self.cluster_permissions.clone();
        }
        if !self.deployments.is_empty() {
            strategy.deployments = self.deployments.clone();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "install-strategy"
    }
}

/// Fills new owned-CRD entries from the Go API sources
pub struct CrdEnricher<'a> {
    fs: &'a dyn FileSystem,
    apis_dir: PathBuf,
}

impl<'a> CrdEnricher<'a> {
    pub fn new(fs: &'a dyn FileSystem, apis_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            apis_dir: apis_dir.into(),
        }
    }

    /// Describe `entry` from its API types, keeping the manifest's identity
    ///
    /// A missing API directory or kind type leaves the entry as it is.
    pub fn enrich(&self, entry: &CrdDescription) -> Result<CrdDescription> {
        let gvk = crd_description_id(entry);
        match crd_description_for_gvk(self.fs, &self.apis_dir, &gvk) {
            Ok(described) => Ok(CrdDescription {
                name: entry.name.clone(),
                version: entry.version.clone(),
                kind: entry.kind.clone(),
                ..described
            }),
            Err(err) if err.is_not_found() => {
                tracing::debug!(api = %gvk, reason = %err, "skipping CSV annotation parsing for API");
                Ok(entry.clone())
            }
            Err(source) => Err(CsvError::Descriptors { gvk, source }),
        }
    }
}

/// Owned CRDs, one entry per served version, in scan order
#[derive(Default)]
pub struct OwnedCrdsUpdate<'a> {
    pub owned: Vec<CrdDescription>,
    cr_ids: IndexSet<GroupVersionKind>,
    enricher: Option<CrdEnricher<'a>>,
}

impl OwnedCrdsUpdate<'_> {
    /// GVKs declared by the owned CRDs, in the order they were first seen
    pub fn cr_ids(&self) -> impl Iterator<Item = &GroupVersionKind> {
        self.cr_ids.iter()
    }
}

impl CsvUpdater for OwnedCrdsUpdate<'_> {
    /// Entries already in the CSV are kept as written; only new ones are
    /// taken from the scan. Entries whose CRD was not scanned are dropped.
    fn apply(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        let existing: HashMap<GroupVersionKind, CrdDescription> = csv
            .spec
            .custom_resource_definitions
            .owned
            .drain(..)
            .map(|desc| (crd_description_id(&desc), desc))
            .collect();

        let mut owned = Vec::with_capacity(self.owned.len());
        for entry in &self.owned {
            let merged = match existing.get(&crd_description_id(entry)) {
                Some(kept) => kept.clone(),
                None => match &self.enricher {
                    Some(enricher) => enricher.enrich(entry)?,
                    None => entry.clone(),
                },
            };
            owned.push(merged);
        }
        csv.spec.custom_resource_definitions.owned = owned;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "owned-crds"
    }
}

/// Example custom resources, stored as JSON
#[derive(Debug, Clone, Default)]
pub struct AlmExamplesUpdate {
    pub crs: Vec<serde_json::Value>,
}

impl CsvUpdater for AlmExamplesUpdate {
    fn apply(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        let examples = serde_json::Value::Array(self.crs.clone());
        let pretty = serde_json::to_string_pretty(&examples).map_err(|e| CsvError::serialize("alm-examples", e))?;
        csv.annotations_mut().insert(ALM_EXAMPLES_ANNOTATION.to_string(), pretty);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "alm-examples"
    }
}

/// Scan-time aggregation of manifests, applied to a CSV in one pass
#[derive(Default)]
pub struct UpdaterStore<'a> {
    install_strategy: InstallStrategyUpdate,
    crds: OwnedCrdsUpdate<'a>,
    alm_examples: AlmExamplesUpdate,
}

impl<'a> UpdaterStore<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrich newly owned CRDs from the Go API types under `apis_dir`
    pub fn with_enricher(mut self, enricher: CrdEnricher<'a>) -> Self {
        self.crds.enricher = Some(enricher);
        self
    }

    /// Route a manifest document by kind
    ///
    /// Returns `false` for kinds the store does not handle; those documents
    /// are candidates for [`UpdaterStore::add_cr`].
    pub fn add_to_updater(&mut self, document: &str, kind: &str) -> Result<bool> {
        match kind {
            "Role" => self.add_role(document)?,
            "ClusterRole" => self.add_cluster_role(document)?,
            "Deployment" => self.add_deployment(document)?,
            "CustomResourceDefinition" => self.add_owned_crd(document)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn add_role(&mut self, document: &str) -> Result<()> {
        let role: RoleManifest = decode("Role", document)?;
        self.install_strategy.permissions.push(permissions_for(role));
        Ok(())
    }

    pub fn add_cluster_role(&mut self, document: &str) -> Result<()> {
        let role: RoleManifest = decode("ClusterRole", document)?;
        self.install_strategy.cluster_permissions.push(permissions_for(role));
        Ok(())
    }

    pub fn add_deployment(&mut self, document: &str) -> Result<()> {
        let mut dep: DeploymentManifest = decode("Deployment", document)?;
        dep.set_watch_namespaces_env();
        if !dep.references_olm_namespaces()? {
            tracing::warn!(
                "No WATCH_NAMESPACE environment variable nor reference to \"{OLM_TARGET_NAMESPACES}\" detected in \
                 operator Deployment. For OLM compatibility, your operator MUST watch namespaces defined in \
                 \"{OLM_TARGET_NAMESPACES}\""
            );
        }
        self.install_strategy.deployments.push(StrategyDeploymentSpec {
            name: dep.metadata.name.unwrap_or_default(),
            spec: dep.spec,
        });
        Ok(())
    }

    /// Every CRD seen is owned by the operator
    pub fn add_owned_crd(&mut self, document: &str) -> Result<()> {
        let crd: CrdManifest = decode("CustomResourceDefinition", document)?;
        let versions = crd.served_versions().map_err(|source| CsvError::CrdVersions {
            name: crd.name().to_string(),
            source: Box::new(source),
        })?;
        for version in versions {
            let desc = CrdDescription {
                name: crd.name().to_string(),
                version,
                kind: crd.spec.names.kind.clone(),
                ..Default::default()
            };
            self.crds.cr_ids.insert(crd_description_id(&desc));
            self.crds.owned.push(desc);
        }
        Ok(())
    }

    /// Add an example custom resource
    pub fn add_cr(&mut self, document: &str) -> Result<()> {
        if document.trim().is_empty() {
            return Ok(());
        }
        let cr: serde_json::Value = decode("custom resource", document)?;
        self.alm_examples.crs.push(cr);
        Ok(())
    }

    pub fn owned_crds(&self) -> &OwnedCrdsUpdate<'a> {
        &self.crds
    }

    /// Run every updater against `csv`
    pub fn apply(&self, csv: &mut ClusterServiceVersion) -> Result<()> {
        let updaters: [&dyn CsvUpdater; 3] = [&self.install_strategy, &self.crds, &self.alm_examples];
        for updater in updaters {
            tracing::debug!(updater = updater.name(), "applying CSV updater");
            updater.apply(csv)?;
        }
        Ok(())
    }
}

fn permissions_for(role: RoleManifest) -> StrategyDeploymentPermissions {
    StrategyDeploymentPermissions {
        service_account_name: role.metadata.name.unwrap_or_default(),
        rules: role.rules,
    }
}

/// Identity of an owned-CRD entry
///
/// Entry names are `<plural>.<group>`, so dropping the first label yields the
/// group.
pub fn crd_description_id(desc: &CrdDescription) -> GroupVersionKind {
    let group = desc.name.split_once('.').map(|(_, group)| group).unwrap_or_default();
    GroupVersionKind::new(group, &desc.version, &desc.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyDetailsDeployment;
    use opsdk_core::MemFileSystem;

    const CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: memcacheds.cache.example.com
spec:
  group: cache.example.com
  names:
    kind: Memcached
    plural: memcacheds
  versions:
    - name: v1alpha1
      served: true
    - name: v1alpha2
      served: true
"#;

    const ROLE: &str = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: memcached-operator
rules:
  - apiGroups: [""]
    resources: ["pods"]
    verbs: ["get", "list"]
"#;

    #[test]
    fn test_add_to_updater_routes_by_kind() {
        let mut store = UpdaterStore::new();
        assert!(store.add_to_updater(ROLE, "Role").unwrap());
        assert!(store.add_to_updater(&ROLE.replace("Role", "ClusterRole"), "ClusterRole").unwrap());
        assert!(!store.add_to_updater("kind: Memcached\n", "Memcached").unwrap());

        assert_eq!(store.install_strategy.permissions.len(), 1);
        assert_eq!(store.install_strategy.permissions[0].service_account_name, "memcached-operator");
        assert_eq!(store.install_strategy.permissions[0].rules[0].verbs, vec!["get", "list"]);
        assert_eq!(store.install_strategy.cluster_permissions.len(), 1);
    }

    #[test]
    fn test_minimal_deployment_enters_install_strategy() {
        let mut store = UpdaterStore::new();
        let handled = store
            .add_to_updater("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: minimal\n", "Deployment")
            .unwrap();
        assert!(handled);
        assert_eq!(store.install_strategy.deployments.len(), 1);
        assert_eq!(store.install_strategy.deployments[0].name, "minimal");
    }

    #[test]
    fn test_owned_crd_per_served_version() {
        let mut store = UpdaterStore::new();
        store.add_owned_crd(CRD).unwrap();

        let owned = &store.owned_crds().owned;
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|d| d.name == "memcacheds.cache.example.com" && d.kind == "Memcached"));
        let ids: Vec<String> = store.owned_crds().cr_ids().map(ToString::to_string).collect();
        assert_eq!(
            ids,
            vec!["cache.example.com/v1alpha1, Kind=Memcached", "cache.example.com/v1alpha2, Kind=Memcached"]
        );
    }

    #[test]
    fn test_owned_crd_without_versions() {
        let mut store = UpdaterStore::new();
        let err = store
            .add_owned_crd("kind: CustomResourceDefinition\nmetadata:\n  name: apps.example.com\n")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to get owned CRD apps.example.com versions: no versions in CRD apps.example.com"
        );
    }

    #[test]
    fn test_existing_owned_entries_keep_user_edits() {
        let mut store = UpdaterStore::new();
        store.add_owned_crd(CRD).unwrap();

        let mut csv = ClusterServiceVersion::default();
        csv.spec.custom_resource_definitions.owned = vec![
            CrdDescription {
                name: "memcacheds.cache.example.com".into(),
                version: "v1alpha2".into(),
                kind: "Memcached".into(),
                display_name: "Memcached App".into(),
                ..Default::default()
            },
            CrdDescription {
                name: "removed.cache.example.com".into(),
                version: "v1".into(),
                kind: "Removed".into(),
                ..Default::default()
            },
        ];
        store.apply(&mut csv).unwrap();

        let owned = &csv.spec.custom_resource_definitions.owned;
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].version, "v1alpha1");
        assert!(owned[0].display_name.is_empty());
        assert_eq!(owned[1].version, "v1alpha2");
        assert_eq!(owned[1].display_name, "Memcached App");
    }

    #[test]
    fn test_install_strategy_replaced_only_when_found() {
        let mut store = UpdaterStore::new();
        store.add_role(ROLE).unwrap();

        let mut csv = ClusterServiceVersion::default();
        csv.spec.install.strategy = INSTALL_STRATEGY_DEPLOYMENT.into();
        csv.spec.install.spec = StrategyDetailsDeployment {
            deployments: vec![StrategyDeploymentSpec {
                name: "kept".into(),
                spec: Default::default(),
            }],
            ..Default::default()
        };
        store.apply(&mut csv).unwrap();

        assert_eq!(csv.spec.install.spec.deployments[0].name, "kept");
        assert_eq!(csv.spec.install.spec.permissions.len(), 1);
        assert!(csv.spec.install.spec.cluster_permissions.is_empty());
    }

    #[test]
    fn test_install_strategy_defaults_to_deployment() {
        let mut csv = ClusterServiceVersion::default();
        UpdaterStore::new().apply(&mut csv).unwrap();
        assert_eq!(csv.spec.install.strategy, "deployment");
    }

    #[test]
    fn test_unknown_install_strategy() {
        let mut csv = ClusterServiceVersion::default();
        csv.spec.install.strategy = "helm".into();
        let err = UpdaterStore::new().apply(&mut csv).unwrap_err();
        assert_eq!(err.to_string(), "install strategy (helm) of unknown type");
    }

    #[test]
    fn test_alm_examples() {
        let mut store = UpdaterStore::new();
        store
            .add_cr("apiVersion: cache.example.com/v1alpha1\nkind: Memcached\nmetadata:\n  name: example\nspec:\n  size: 3\n")
            .unwrap();

        let mut csv = ClusterServiceVersion::default();
        store.apply(&mut csv).unwrap();

        insta::assert_snapshot!(csv.annotation(ALM_EXAMPLES_ANNOTATION).unwrap(), @r#"
        [
          {
            "apiVersion": "cache.example.com/v1alpha1",
            "kind": "Memcached",
            "metadata": {
              "name": "example"
            },
            "spec": {
              "size": 3
            }
          }
        ]
        "#);
    }

    #[test]
    fn test_no_crs_writes_empty_examples() {
        let mut csv = ClusterServiceVersion::default();
        csv.annotations_mut()
            .insert(ALM_EXAMPLES_ANNOTATION.to_string(), "[{\"kind\": \"Stale\"}]".to_string());
        UpdaterStore::new().apply(&mut csv).unwrap();
        assert_eq!(csv.annotation(ALM_EXAMPLES_ANNOTATION), Some("[]"));
    }

    #[test]
    fn test_enricher_skips_missing_api_dir() {
        let fs = MemFileSystem::new();
        let mut store = UpdaterStore::new().with_enricher(CrdEnricher::new(&fs, "pkg/apis"));
        store.add_owned_crd(CRD).unwrap();

        let mut csv = ClusterServiceVersion::default();
        store.apply(&mut csv).unwrap();

        let owned = &csv.spec.custom_resource_definitions.owned;
        assert_eq!(owned.len(), 2);
        assert!(owned[0].spec_descriptors.is_empty());
    }

    #[test]
    fn test_enricher_describes_new_entries() {
        let fs = MemFileSystem::new().with_text_file(
            "pkg/apis/cache/v1alpha1/memcached_types.go",
            r#"package v1alpha1

type MemcachedSpec struct {
	// Size is the size of the memcached deployment
	// +operator-sdk:gen-csv:customresourcedefinitions.specDescriptors=true
	Size int32 `json:"size"`
}

// Memcached is the Schema for the memcacheds API
// +operator-sdk:gen-csv:customresourcedefinitions.displayName="Memcached App"
type Memcached struct {
	Spec MemcachedSpec `json:"spec,omitempty"`
}
"#,
        );
        let enricher = CrdEnricher::new(&fs, "pkg/apis");
        let entry = CrdDescription {
            name: "memcacheds.cache.example.com".into(),
            version: "v1alpha1".into(),
            kind: "Memcached".into(),
            ..Default::default()
        };

        let described = enricher.enrich(&entry).unwrap();
        assert_eq!(described.name, "memcacheds.cache.example.com");
        assert_eq!(described.display_name, "Memcached App");
        assert_eq!(described.description, "Memcached is the Schema for the memcacheds API");
        assert_eq!(described.spec_descriptors.len(), 1);
        assert_eq!(described.spec_descriptors[0].path, "size");
        assert_eq!(
            described.spec_descriptors[0].x_descriptors,
            vec!["urn:alm:descriptor:com.tectonic.ui:podCount"]
        );
    }

    #[test]
    fn test_enricher_reports_bad_annotations() {
        let fs = MemFileSystem::new().with_text_file(
            "pkg/apis/cache/v1alpha1/memcached_types.go",
            r#"package v1alpha1

// +operator-sdk:gen-csv:customresourcedefinitions.bogus=true
type Memcached struct {
}
"#,
        );
        let enricher = CrdEnricher::new(&fs, "pkg/apis");
        let entry = CrdDescription {
            name: "memcacheds.cache.example.com".into(),
            version: "v1alpha1".into(),
            kind: "Memcached".into(),
            ..Default::default()
        };

        let err = enricher.enrich(&entry).unwrap_err();
        assert!(matches!(err, CsvError::Descriptors { .. }));
        assert!(
            err.to_string()
                .starts_with("failed to set CRD descriptors for cache.example.com/v1alpha1, Kind=Memcached")
        );
    }

    #[test]
    fn test_crd_description_id() {
        let desc = CrdDescription {
            name: "memcacheds.cache.example.com".into(),
            version: "v1alpha1".into(),
            kind: "Memcached".into(),
            ..Default::default()
        };
        assert_eq!(
            crd_description_id(&desc),
            GroupVersionKind::new("cache.example.com", "v1alpha1", "Memcached")
        );
    }
}
