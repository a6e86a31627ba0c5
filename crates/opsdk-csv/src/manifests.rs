//! User-authored manifests read during a CSV scan
//!
//! The documents are decoded leniently: only the fields the generator
//! consumes are required, and any API version of a kind is accepted.

use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};
use k8s_openapi::api::rbac::v1::PolicyRule;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CsvError, Result};

/// Env var an operator reads its watched namespaces from
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

/// Field path OLM fills with the operator group's target namespaces
pub const OLM_TARGET_NAMESPACES: &str = "metadata.annotations['olm.targetNamespaces']";

/// A `Role` or `ClusterRole`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, deserialize_with = "lenient_deployment_spec")]
    pub spec: DeploymentSpec,
}

/// Decode a Deployment spec that may lack `selector` or `template`
///
/// Both are required by the API schema, but a manifest without them still
/// describes a deployment the CSV can carry.
pub(crate) fn lenient_deployment_spec<'de, D>(deserializer: D) -> std::result::Result<DeploymentSpec, D::Error>
where
    D: Deserializer<'de>,
{
    let mut value = Value::deserialize(deserializer)?;
    let Some(fields) = value.as_object_mut() else {
        return Ok(DeploymentSpec::default());
    };
    for required in ["selector", "template"] {
        if fields.get(required).is_none_or(Value::is_null) {
            fields.insert(required.to_string(), Value::Object(Default::default()));
        }
    }
    serde_json::from_value(value).map_err(serde::de::Error::custom)
}

impl DeploymentManifest {
    /// Point every container's `WATCH_NAMESPACE` at the OLM target namespaces
    pub fn set_watch_namespaces_env(&mut self) {
        let Some(pod) = self.spec.template.spec.as_mut() else {
            return;
        };
        for container in &mut pod.containers {
            for env in container.env.iter_mut().flatten() {
                if env.name == WATCH_NAMESPACE_ENV {
                    *env = field_ref_env(WATCH_NAMESPACE_ENV, OLM_TARGET_NAMESPACES);
                }
            }
        }
    }

    /// True when the pod template references the OLM target namespaces anywhere
    pub fn references_olm_namespaces(&self) -> Result<bool> {
        let template = serde_json::to_string(&self.spec.template)
            .map_err(|e| CsvError::serialize("Deployment pod template", e))?;
        Ok(template.contains(OLM_TARGET_NAMESPACES))
    }
}

fn field_ref_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The parts of a `CustomResourceDefinition` that identify its API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrdManifest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CrdManifestSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrdManifestSpec {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub names: CrdNames,
    /// Legacy single-version field
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrdNames {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub plural: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrdVersion {
    pub name: String,
    #[serde(default)]
    pub served: bool,
}

impl CrdManifest {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Served versions, or the legacy `spec.version` when no list is declared
    pub fn served_versions(&self) -> Result<Vec<String>> {
        let versions: Vec<String> = if self.spec.versions.is_empty() {
            Some(self.spec.version.clone())
                .filter(|v| !v.is_empty())
                .into_iter()
                .collect()
        } else {
            self.spec
                .versions
                .iter()
                .filter(|v| v.served)
                .map(|v| v.name.clone())
                .collect()
        };
        if versions.is_empty() {
            return Err(CsvError::NoCrdVersions(self.name().to_string()));
        }
        Ok(versions)
    }
}

/// Decode one manifest document, naming its kind on failure
pub fn decode<T: DeserializeOwned>(kind: &str, document: &str) -> Result<T> {
    serde_yaml::from_str(document).map_err(|source| CsvError::Decode {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: memcached-operator
spec:
  replicas: 1
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
          image: quay.io/example/memcached-operator:v0.0.1
          env:
            - name: WATCH_NAMESPACE
              valueFrom:
                fieldRef:
                  fieldPath: metadata.namespace
            - name: OPERATOR_NAME
              value: memcached-operator
"#;

    #[test]
    fn test_set_watch_namespaces_env() {
        let mut dep: DeploymentManifest = decode("Deployment", DEPLOYMENT).unwrap();
        assert!(!dep.references_olm_namespaces().unwrap());

        dep.set_watch_namespaces_env();

        let pod = dep.spec.template.spec.as_ref().unwrap();
        let env = pod.containers[0].env.as_ref().unwrap();
        let field_path = env[0]
            .value_from
            .as_ref()
            .and_then(|v| v.field_ref.as_ref())
            .map(|f| f.field_path.as_str());
        assert_eq!(field_path, Some(OLM_TARGET_NAMESPACES));
        assert_eq!(env[1].value.as_deref(), Some("memcached-operator"));
        assert!(dep.references_olm_namespaces().unwrap());
    }

    #[test]
    fn test_deployment_without_watch_namespace() {
        let manifest = DEPLOYMENT.replace("WATCH_NAMESPACE", "POD_NAMESPACE");
        let mut dep: DeploymentManifest = decode("Deployment", &manifest).unwrap();
        dep.set_watch_namespaces_env();
        assert!(!dep.references_olm_namespaces().unwrap());
    }

    #[test]
    fn test_minimal_deployment() {
        let dep: DeploymentManifest = decode(
            "Deployment",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: minimal\nspec:\n  replicas: 2\n",
        )
        .unwrap();
        assert_eq!(dep.metadata.name.as_deref(), Some("minimal"));
        assert_eq!(dep.spec.replicas, Some(2));
        assert!(dep.spec.template.spec.is_none());

        let bare: DeploymentManifest =
            decode("Deployment", "kind: Deployment\nmetadata:\n  name: bare\nspec:\n").unwrap();
        assert_eq!(bare.spec, DeploymentSpec::default());

        let mut dep = dep;
        dep.set_watch_namespaces_env();
        assert!(!dep.references_olm_namespaces().unwrap());
    }

    #[test]
    fn test_served_versions() {
        let crd: CrdManifest = decode(
            "CustomResourceDefinition",
            r#"
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
      served: false
    - name: v1beta1
      served: true
"#,
        )
        .unwrap();
        assert_eq!(crd.served_versions().unwrap(), vec!["v1alpha1", "v1beta1"]);
    }

    #[test]
    fn test_legacy_version_field() {
        let crd: CrdManifest = decode(
            "CustomResourceDefinition",
            "metadata:\n  name: apps.example.com\nspec:\n  version: v1\n  names:\n    kind: App\n",
        )
        .unwrap();
        assert_eq!(crd.served_versions().unwrap(), vec!["v1"]);
    }

    #[test]
    fn test_no_served_versions() {
        let crd: CrdManifest = decode(
            "CustomResourceDefinition",
            "metadata:\n  name: apps.example.com\nspec:\n  versions:\n    - name: v1\n      served: false\n",
        )
        .unwrap();
        let err = crd.served_versions().unwrap_err();
        assert_eq!(err.to_string(), "no versions in CRD apps.example.com");
    }

    #[test]
    fn test_decode_error_names_kind() {
        let err = decode::<RoleManifest>("Role", "rules: 3").unwrap_err();
        assert!(err.to_string().starts_with("failed to decode Role manifest"));
    }
}
