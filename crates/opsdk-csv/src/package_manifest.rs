//! `<operator>.package.yaml`: the channels an operator is published under

use std::path::{Path, PathBuf};

use opsdk_core::FileSystem;
use serde::{Deserialize, Serialize};

use crate::error::{CsvError, Result};
use crate::types::csv_name;

pub const PACKAGE_MANIFEST_EXT: &str = ".package.yaml";

/// Channel given to a new package manifest when none is requested
pub const DEFAULT_CHANNEL: &str = "alpha";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub package_name: String,
    #[serde(default)]
    pub channels: Vec<PackageChannel>,
    #[serde(default, rename = "defaultChannel", skip_serializing_if = "String::is_empty")]
    pub default_channel_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageChannel {
    pub name: String,
    #[serde(rename = "currentCSV")]
    pub current_csv_name: String,
}

impl PackageManifest {
    /// A manifest with one channel, also the default, pointing at the CSV
    pub fn new(operator_name: &str, channel: Option<&str>, csv_version: &str) -> Self {
        let channel = channel.filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CHANNEL);
        let lower_name = operator_name.to_lowercase();
        Self {
            package_name: lower_name.clone(),
            channels: vec![PackageChannel {
                name: channel.to_string(),
                current_csv_name: csv_name(&lower_name, csv_version),
            }],
            default_channel_name: channel.to_string(),
        }
    }

    /// Point `channel` at the CSV, adding the channel when it is new
    pub fn set_channel(&mut self, operator_name: &str, channel: &str, csv_version: &str, is_default: bool) {
        let current = csv_name(&operator_name.to_lowercase(), csv_version);
        match self.channels.iter_mut().find(|c| c.name == channel) {
            Some(existing) => existing.current_csv_name = current,
            None => self.channels.push(PackageChannel {
                name: channel.to_string(),
                current_csv_name: current,
            }),
        }
        if is_default {
            self.default_channel_name = channel.to_string();
        }
    }

    pub fn sort_channels(&mut self) {
        self.channels.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.package_name.is_empty() {
            return Err("package name cannot be empty".to_string());
        }
        if self.channels.is_empty() {
            return Err("channels cannot be empty".to_string());
        }
        if let Some(c) = self.channels.iter().find(|c| c.current_csv_name.is_empty()) {
            return Err(format!("channel {} currentCSV cannot be empty", c.name));
        }
        Ok(())
    }

    /// Log when the default channel is unset or names no channel
    fn check_default_channel(&self) {
        if self.default_channel_name.is_empty() {
            tracing::warn!("Package manifest default channel is empty and should be set to an existing channel.");
        } else if !self.channels.iter().any(|c| c.name == self.default_channel_name) {
            tracing::warn!(
                "Package manifest default channel {} does not exist in channels.",
                self.default_channel_name
            );
        }
    }
}

/// Where a package manifest for `operator_name` lives under `package_dir`
pub fn package_manifest_path(package_dir: &Path, operator_name: &str) -> PathBuf {
    package_dir.join(format!("{}{PACKAGE_MANIFEST_EXT}", operator_name.to_lowercase()))
}

/// Create or update the package manifest in `package_dir`
///
/// With no `channel`, an existing manifest is left as it is.
pub fn generate_package_manifest(
    fs: &dyn FileSystem,
    package_dir: &Path,
    operator_name: &str,
    csv_version: &str,
    channel: Option<&str>,
    is_default: bool,
) -> Result<PathBuf> {
    let path = package_manifest_path(package_dir, operator_name);
    let channel = channel.filter(|c| !c.is_empty());

    let mut pkg = if fs.exists(&path) {
        let content = fs.read_to_string(&path)?;
        let pkg: PackageManifest =
            serde_yaml::from_str(&content).map_err(|source| CsvError::PackageManifestParse {
                path: path.clone(),
                source,
            })?;
        pkg.validate().map_err(|message| CsvError::InvalidPackageManifest {
            name: pkg.package_name.clone(),
            message,
        })?;
        if channel.is_none() {
            pkg.check_default_channel();
            return Ok(path);
        }
        pkg
    } else {
        PackageManifest::new(operator_name, channel, csv_version)
    };

    if let Some(channel) = channel {
        pkg.set_channel(operator_name, channel, csv_version, is_default);
    }
    pkg.check_default_channel();
    pkg.sort_channels();

    let rendered = serde_yaml::to_string(&pkg).map_err(|e| CsvError::serialize("package manifest", e))?;
    fs.write(&path, rendered.as_bytes())?;
    Ok(path)
}
