//! Owned-CRD metadata as it appears in a ClusterServiceVersion
//!
//! Field order follows the serialized manifest layout.

use serde::{Deserialize, Serialize};

/// One `spec.customresourcedefinitions.owned` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdDescription {
    pub name: String,
    pub version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ApiResourceReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_descriptors: Vec<StatusDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_descriptors: Vec<SpecDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_descriptors: Vec<ActionDescriptor>,
}

/// A Kubernetes resource the operator creates for a custom resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResourceReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub kind: String,
    pub version: String,
}

/// UI metadata for a field under `spec`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDescriptor {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, rename = "x-descriptors", skip_serializing_if = "Vec::is_empty")]
    pub x_descriptors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// UI metadata for a field under `status`; same shape as [`SpecDescriptor`]
pub type StatusDescriptor = SpecDescriptor;

/// UI metadata for an action on a custom resource; same shape as [`SpecDescriptor`]
pub type ActionDescriptor = SpecDescriptor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_layout() {
        let desc = CrdDescription {
            name: "memcacheds.cache.example.com".into(),
            version: "v1alpha1".into(),
            kind: "Memcached".into(),
            display_name: "Memcached App".into(),
            resources: vec![ApiResourceReference {
                name: String::new(),
                kind: "Deployment".into(),
                version: "v1".into(),
            }],
            spec_descriptors: vec![SpecDescriptor {
                path: "size".into(),
                display_name: "Size".into(),
                x_descriptors: vec!["urn:alm:descriptor:com.tectonic.ui:podCount".into()],
                ..Default::default()
            }],
            ..Default::default()
        };

        insta::assert_snapshot!(serde_json::to_string_pretty(&desc).unwrap(), @r#"
        {
          "name": "memcacheds.cache.example.com",
          "version": "v1alpha1",
          "kind": "Memcached",
          "displayName": "Memcached App",
          "resources": [
            {
              "kind": "Deployment",
              "version": "v1"
            }
          ],
          "specDescriptors": [
            {
              "path": "size",
              "displayName": "Size",
              "x-descriptors": [
                "urn:alm:descriptor:com.tectonic.ui:podCount"
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_deserialize_keeps_user_fields() {
        let yaml = r#"
name: memcacheds.cache.example.com
version: v1alpha1
kind: Memcached
description: Edited by hand
actionDescriptors:
  - path: restart
    displayName: Restart
specDescriptors:
  - path: size
    value: 3
"#;
        let desc: CrdDescription = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(desc.description, "Edited by hand");
        assert_eq!(desc.action_descriptors[0].path, "restart");
        assert_eq!(desc.spec_descriptors[0].value, Some(serde_json::json!(3)));
    }
}
