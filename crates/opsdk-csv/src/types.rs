//! ClusterServiceVersion data model
//!
//! Only the parts of the CSV the generator reads or writes are modeled as
//! typed fields. Anything else found in an existing CSV is carried through
//! untouched in the `extra` maps so user content survives a regeneration.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use opsdk_descriptor::CrdDescription;
use semver::Version;
use serde::{Deserialize, Serialize};

pub const CSV_API_VERSION: &str = "operators.coreos.com/v1alpha1";
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// Install strategy name for deployment-based operators
pub const INSTALL_STRATEGY_DEPLOYMENT: &str = "deployment";

/// Annotation holding the example custom resources
pub const ALM_EXAMPLES_ANNOTATION: &str = "alm-examples";

/// Annotation holding the operator capability level
pub const CAPABILITIES_ANNOTATION: &str = "capabilities";

/// A ClusterServiceVersion manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersion {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: CsvSpec,
}

impl ClusterServiceVersion {
    /// Annotations map, created on first use
    pub fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.metadata.annotations.get_or_insert_with(BTreeMap::new)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvSpec {
    #[serde(default)]
    pub install: NamedInstallStrategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maturity: String,

    #[serde(
        default,
        rename = "customresourcedefinitions",
        skip_serializing_if = "CustomResourceDefinitions::is_empty"
    )]
    pub custom_resource_definitions: CustomResourceDefinitions,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    #[serde(default)]
    pub provider: AppLink,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<AppLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_modes: Vec<InstallMode>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replaces: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    /// Fields such as `icon` or `apiservicedefinitions` kept as written
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedInstallStrategy {
    #[serde(default)]
    pub strategy: String,

    #[serde(default)]
    pub spec: StrategyDetailsDeployment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDetailsDeployment {
    #[serde(default)]
    pub deployments: Vec<StrategyDeploymentSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<StrategyDeploymentPermissions>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_permissions: Vec<StrategyDeploymentPermissions>,
}

/// A named Deployment spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyDeploymentSpec {
    pub name: String,
    #[serde(default, deserialize_with = "crate::manifests::lenient_deployment_spec")]
    pub spec: DeploymentSpec,
}

/// RBAC rules bound to a service account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDeploymentPermissions {
    pub service_account_name: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomResourceDefinitions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned: Vec<CrdDescription>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<CrdDescription>,
}

impl CustomResourceDefinitions {
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.required.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLink {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl AppLink {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.url.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMode {
    #[serde(rename = "type")]
    pub mode: InstallModeType,
    pub supported: bool,
}

impl InstallMode {
    pub fn new(mode: InstallModeType, supported: bool) -> Self {
        Self { mode, supported }
    }
}

/// The namespace scopes OLM can install an operator into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallModeType {
    OwnNamespace,
    SingleNamespace,
    MultiNamespace,
    AllNamespaces,
}

/// `<operator>.v<version>`
pub fn csv_name(operator_name: &str, version: &str) -> String {
    format!("{operator_name}.v{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING_CSV: &str = r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: memcached-operator.v0.0.2
  namespace: placeholder
  annotations:
    capabilities: Basic Install
spec:
  displayName: Memcached Operator
  icon:
  - base64data: abc
    mediatype: image/png
  install:
    strategy: deployment
    spec:
      deployments:
      - name: memcached-operator
        spec:
          selector:
            matchLabels:
              name: memcached-operator
          template:
            metadata:
              labels:
                name: memcached-operator
            spec:
              containers:
              - name: memcached-operator
                image: quay.io/example/memcached-operator:v0.0.2
  installModes:
  - type: OwnNamespace
    supported: true
  version: 0.0.2
"#;

    #[test]
    fn test_parse_existing_csv() {
        let csv: ClusterServiceVersion = serde_yaml::from_str(EXISTING_CSV).unwrap();

        assert_eq!(csv.name(), "memcached-operator.v0.0.2");
        assert_eq!(csv.annotation(CAPABILITIES_ANNOTATION), Some("Basic Install"));
        assert_eq!(csv.spec.version, Some(Version::new(0, 0, 2)));
        assert_eq!(csv.spec.install.strategy, INSTALL_STRATEGY_DEPLOYMENT);
        assert_eq!(csv.spec.install.spec.deployments.len(), 1);
        assert_eq!(
            csv.spec.install_modes,
            vec![InstallMode::new(InstallModeType::OwnNamespace, true)]
        );
        assert!(csv.spec.extra.contains_key("icon"));
    }

    #[test]
    fn test_unmodeled_fields_survive_round_trip() {
        let csv: ClusterServiceVersion = serde_yaml::from_str(EXISTING_CSV).unwrap();
        let rendered = serde_yaml::to_string(&csv).unwrap();
        let reparsed: ClusterServiceVersion = serde_yaml::from_str(&rendered).unwrap();

        assert_eq!(csv, reparsed);
        assert!(rendered.contains("base64data: abc"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let csv = ClusterServiceVersion::default();
        let value = serde_json::to_value(&csv).unwrap();
        let spec = value["spec"].as_object().unwrap();

        assert!(!spec.contains_key("customresourcedefinitions"));
        assert!(!spec.contains_key("replaces"));
        assert!(!spec.contains_key("version"));
        assert!(spec.contains_key("provider"));
        assert!(spec.contains_key("install"));
    }

    #[test]
    fn test_csv_name() {
        assert_eq!(csv_name("memcached-operator", "0.1.0"), "memcached-operator.v0.1.0");
    }
}
