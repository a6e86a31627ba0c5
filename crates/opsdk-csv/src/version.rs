//! CSV versioning: flag validation and the version bump
//!
//! A bump rewrites the old version inside the CSV's metadata, labels and
//! selector, renames every reference to the old CSV, and chains the old CSV
//! through `spec.replaces`. Other spec fields, notably container images, are
//! left alone.

use regex::Regex;
use semver::Version;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CsvError, Result};
use crate::types::{ClusterServiceVersion, csv_name};

/// Parse a version flag, rejecting values that do not print back unchanged
pub fn parse_csv_version(version: &str) -> Result<Version> {
    if version.is_empty() {
        return Err(CsvError::MissingVersion);
    }
    let parsed = Version::parse(version).map_err(|source| CsvError::InvalidVersion {
        version: version.to_string(),
        source,
    })?;
    if parsed.to_string() != version {
        return Err(CsvError::BadVersion {
            version: version.to_string(),
            parsed: parsed.to_string(),
        });
    }
    Ok(parsed)
}

/// A base version equal to the target would bump nothing
pub fn check_from_version(csv_version: &Version, from_version: &Version) -> Result<()> {
    if csv_version == from_version {
        return Err(CsvError::SameVersion(from_version.to_string()));
    }
    Ok(())
}

/// Move `csv` to `new_version`
///
/// Returns `false` without touching the CSV when it has no version yet or is
/// already at `new_version`.
pub fn update_csv_version(
    csv: &mut ClusterServiceVersion,
    operator_name: &str,
    new_version: &Version,
) -> Result<bool> {
    let old_version = match &csv.spec.version {
        Some(v) if v != new_version => v.to_string(),
        _ => return Ok(false),
    };
    let new_version_str = new_version.to_string();

    replace_in(&mut csv.metadata, &old_version, &new_version_str)?;
    replace_in(&mut csv.spec.labels, &old_version, &new_version_str)?;
    if let Some(selector) = csv.spec.selector.as_mut() {
        replace_in(selector, &old_version, &new_version_str)?;
    }

    let lower_name = operator_name.to_lowercase();
    let old_name = csv_name(&lower_name, &old_version);
    let new_name = csv_name(&lower_name, &new_version_str);
    rename_csv(csv, &old_name, &new_name)?;

    tracing::debug!(from = %old_name, to = %new_name, "bumped CSV version");
    csv.spec.version = Some(new_version.clone());
    csv.spec.replaces = old_name;
    Ok(true)
}

/// Replace `from` with `to` in every string of `target`, keys included
fn replace_in<T: Serialize + DeserializeOwned>(target: &mut T, from: &str, to: &str) -> Result<()> {
    let mut value = serde_json::to_value(&*target).map_err(|e| CsvError::serialize("CSV field", e))?;
    rewrite_strings(&mut value, &|s: &str| s.replace(from, to));
    *target = serde_json::from_value(value).map_err(|e| CsvError::serialize("CSV field", e))?;
    Ok(())
}

/// Rename whole-word occurrences of the old CSV name anywhere in the CSV
fn rename_csv(csv: &mut ClusterServiceVersion, old_name: &str, new_name: &str) -> Result<()> {
    let pattern = format!(r"\b{}\b", regex::escape(old_name));
    let re = Regex::new(&pattern).map_err(|e| CsvError::serialize("CSV name pattern", e))?;
    let mut value = serde_json::to_value(&*csv).map_err(|e| CsvError::serialize("CSV", e))?;
    rewrite_strings(&mut value, &|s: &str| re.replace_all(s, new_name).into_owned());
    *csv = serde_json::from_value(value).map_err(|e| CsvError::serialize("CSV", e))?;
    Ok(())
}

fn rewrite_strings(value: &mut Value, rewrite: &dyn Fn(&str) -> String) {
    match value {
        Value::String(s) => *s = rewrite(s),
        Value::Array(items) => items.iter_mut().for_each(|v| rewrite_strings(v, rewrite)),
        Value::Object(map) => {
            let entries = std::mem::take(map);
            for (key, mut v) in entries {
                rewrite_strings(&mut v, rewrite);
                map.insert(rewrite(&key), v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: memcached-operator.v0.0.1
  namespace: placeholder
  labels:
    operator-version: 0.0.1
  annotations:
    containerImage: quay.io/example/memcached-operator:v0.0.1
spec:
  description: Upgrade notes for memcached-operator.v0.0.1 and memcached-operator.v0.0.10
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
                image: quay.io/example/memcached-operator:v0.0.1
  labels:
    version: 0.0.1
  selector:
    matchLabels:
      version: 0.0.1
  version: 0.0.1
"#;

    fn image(csv: &ClusterServiceVersion) -> String {
        let dep = &csv.spec.install.spec.deployments[0];
        let pod = dep.spec.template.spec.as_ref().unwrap();
        pod.containers[0].image.clone().unwrap_or_default()
    }

    #[test]
    fn test_parse_csv_version() {
        assert_eq!(parse_csv_version("0.1.0").unwrap(), Version::new(0, 1, 0));
        assert!(matches!(parse_csv_version(""), Err(CsvError::MissingVersion)));
        assert!(matches!(parse_csv_version("one"), Err(CsvError::InvalidVersion { .. })));
    }

    #[test]
    fn test_leading_zeros_rejected() {
        let err = parse_csv_version("0.01.0");
        // semver itself refuses leading zeros; both paths must fail
        assert!(err.is_err());
    }

    #[test]
    fn test_check_from_version() {
        let v1 = Version::new(0, 1, 0);
        assert!(check_from_version(&Version::new(0, 2, 0), &v1).is_ok());
        let err = check_from_version(&v1, &v1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "from-version (0.1.0) cannot equal csv-version; set only csv-version instead"
        );
    }

    #[test]
    fn test_bump_to_new_version() {
        let mut csv: ClusterServiceVersion = serde_yaml::from_str(CSV).unwrap();
        let bumped = update_csv_version(&mut csv, "Memcached-Operator", &Version::new(0, 0, 2)).unwrap();

        assert!(bumped);
        assert_eq!(csv.name(), "memcached-operator.v0.0.2");
        assert_eq!(csv.spec.replaces, "memcached-operator.v0.0.1");
        assert_eq!(csv.spec.version, Some(Version::new(0, 0, 2)));
        assert_eq!(csv.spec.labels["version"], "0.0.2");
        let selector = csv.spec.selector.as_ref().and_then(|s| s.match_labels.as_ref()).unwrap();
        assert_eq!(selector["version"], "0.0.2");
        let labels = csv.metadata.labels.as_ref().unwrap();
        assert_eq!(labels["operator-version"], "0.0.2");
    }

    #[test]
    fn test_bump_leaves_image_untouched() {
        let mut csv: ClusterServiceVersion = serde_yaml::from_str(CSV).unwrap();
        update_csv_version(&mut csv, "memcached-operator", &Version::new(0, 0, 2)).unwrap();

        assert_eq!(image(&csv), "quay.io/example/memcached-operator:v0.0.1");
    }

    #[test]
    fn test_bump_renames_whole_csv_names_only() {
        let mut csv: ClusterServiceVersion = serde_yaml::from_str(CSV).unwrap();
        update_csv_version(&mut csv, "memcached-operator", &Version::new(0, 0, 2)).unwrap();

        assert_eq!(
            csv.spec.description,
            "Upgrade notes for memcached-operator.v0.0.2 and memcached-operator.v0.0.10"
        );
    }

    #[test]
    fn test_same_version_is_noop() {
        let mut csv: ClusterServiceVersion = serde_yaml::from_str(CSV).unwrap();
        let before = csv.clone();
        let bumped = update_csv_version(&mut csv, "memcached-operator", &Version::new(0, 0, 1)).unwrap();

        assert!(!bumped);
        assert_eq!(csv, before);
    }

    #[test]
    fn test_missing_version_is_noop() {
        let mut csv = ClusterServiceVersion::default();
        let bumped = update_csv_version(&mut csv, "memcached-operator", &Version::new(0, 0, 1)).unwrap();

        assert!(!bumped);
        assert!(csv.spec.replaces.is_empty());
    }
}
