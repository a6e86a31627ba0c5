//! CSV generation
//!
//! A run moves a CSV through these states:
//!
//! ```text
//! no CSV on disk ──> new CSV ─────────────┐
//!                                         ├─> updated from manifests ──> defaults ──> written
//! CSV on disk ──> loaded ──> version bump ┘
//! ```
//!
//! The base CSV is the one at `--from-version` when given, otherwise the one
//! at the target version, so re-running a generation updates in place.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use opsdk_core::{FileSystem, GroupVersionKind, split_documents, type_meta_from_bytes};
use semver::Version;

use crate::config::{CsvConfig, manifest_paths_in};
use crate::defaults::{empty_required_fields, join_fields, set_csv_default_fields};
use crate::error::{CsvError, Result};
use crate::manifests::{CrdManifest, decode};
use crate::package_manifest::generate_package_manifest;
use crate::types::{ClusterServiceVersion, csv_name};
use crate::updaters::{CrdEnricher, UpdaterStore};
use crate::version::update_csv_version;

pub const OLM_CATALOG_DIR: &str = "deploy/olm-catalog";
pub const CSV_FILE_EXT: &str = ".clusterserviceversion.yaml";
pub const DEFAULT_APIS_DIR: &str = "pkg/apis";
const CRD_FILE_EXT: &str = ".crd.yaml";

/// Inputs of one `gen-csv` run
#[derive(Debug, Clone)]
pub struct GenCsvOptions {
    pub operator_name: String,
    pub csv_version: Version,
    pub from_version: Option<Version>,
    /// Root every other relative path is resolved against
    pub project_dir: PathBuf,
    pub config_path: PathBuf,
    pub apis_dir: PathBuf,
    /// Package manifest channel for the new CSV
    pub channel: Option<String>,
    pub default_channel: bool,
    /// Copy CRD manifests into the CSV's version directory
    pub update_crds: bool,
}

impl GenCsvOptions {
    pub fn new(operator_name: impl Into<String>, csv_version: Version) -> Self {
        Self {
            operator_name: operator_name.into(),
            csv_version,
            from_version: None,
            project_dir: PathBuf::from("."),
            config_path: Path::new(OLM_CATALOG_DIR).join(crate::config::CSV_CONFIG_FILE),
            apis_dir: PathBuf::from(DEFAULT_APIS_DIR),
            channel: None,
            default_channel: false,
            update_crds: false,
        }
    }
}

/// Where the base CSV of a run came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    New,
    Existing(PathBuf),
}

/// Files written by [`CsvGenerator::generate`]
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub csv_path: PathBuf,
    pub package_manifest_path: PathBuf,
    pub crd_paths: Vec<PathBuf>,
    pub source: CsvSource,
    pub missing_fields: Vec<&'static str>,
}

pub struct CsvGenerator<'a> {
    fs: &'a dyn FileSystem,
    opts: GenCsvOptions,
}

impl<'a> CsvGenerator<'a> {
    pub fn new(fs: &'a dyn FileSystem, opts: GenCsvOptions) -> Self {
        Self { fs, opts }
    }

    pub fn options(&self) -> &GenCsvOptions {
        &self.opts
    }

    fn lower_name(&self) -> String {
        self.opts.operator_name.to_lowercase()
    }

    /// `deploy/olm-catalog/<operator>`, holding one directory per version
    pub fn package_dir(&self) -> PathBuf {
        self.opts.project_dir.join(OLM_CATALOG_DIR).join(self.lower_name())
    }

    pub fn bundle_dir(&self, version: &Version) -> PathBuf {
        self.package_dir().join(version.to_string())
    }

    pub fn csv_path(&self, version: &Version) -> PathBuf {
        let file_name = format!("{}{CSV_FILE_EXT}", csv_name(&self.lower_name(), &version.to_string()));
        self.bundle_dir(version).join(file_name)
    }

    /// Write the CSV, the package manifest and, if requested, the bundle CRDs
    pub fn generate(&self) -> Result<GenerateReport> {
        let config = CsvConfig::load(self.fs, &self.opts.project_dir, &self.opts.config_path)?;
        let (csv, source) = self.render_with(&config)?;
        let csv_path = self.csv_path(&self.opts.csv_version);
        let missing_fields = empty_required_fields(&csv);

        let rendered = serde_yaml::to_string(&csv).map_err(|e| CsvError::serialize("CSV", e))?;
        self.fs.write(&csv_path, rendered.as_bytes())?;

        let package_manifest_path = generate_package_manifest(
            self.fs,
            &self.package_dir(),
            &self.opts.operator_name,
            &self.opts.csv_version.to_string(),
            self.opts.channel.as_deref(),
            self.opts.default_channel,
        )?;

        let crd_paths = if self.opts.update_crds {
            self.write_bundle_crds(&config)?
        } else {
            Vec::new()
        };

        Ok(GenerateReport {
            csv_path,
            package_manifest_path,
            crd_paths,
            source,
            missing_fields,
        })
    }

    /// Build the CSV in memory without writing anything
    pub fn render(&self) -> Result<(ClusterServiceVersion, CsvSource)> {
        let config = CsvConfig::load(self.fs, &self.opts.project_dir, &self.opts.config_path)?;
        self.render_with(&config)
    }

    fn render_with(&self, config: &CsvConfig) -> Result<(ClusterServiceVersion, CsvSource)> {
        let target = &self.opts.csv_version;
        let (mut csv, source) = match self.base_csv()? {
            Some((csv, path)) => (csv, CsvSource::Existing(path)),
            None => (ClusterServiceVersion::default(), CsvSource::New),
        };

        if source != CsvSource::New {
            update_csv_version(&mut csv, &self.opts.operator_name, target)?;
        }
        if csv.spec.version.is_none() {
            csv.spec.version = Some(target.clone());
        }

        self.update_from_manifests(config, &mut csv)?;
        set_csv_default_fields(&mut csv, &self.opts.operator_name, &target.to_string());

        let fields = empty_required_fields(&csv);
        if !fields.is_empty() {
            let path = self.csv_path(target);
            match source {
                CsvSource::Existing(_) => tracing::warn!(
                    "Required csv fields not filled in file {}:{}",
                    path.display(),
                    join_fields(&fields)
                ),
                CsvSource::New => tracing::info!(
                    "Fill in the following required fields in file {}:{}",
                    path.display(),
                    join_fields(&fields)
                ),
            }
        }

        Ok((csv, source))
    }

    /// Load the CSV at `--from-version`, or at the target version
    fn base_csv(&self) -> Result<Option<(ClusterServiceVersion, PathBuf)>> {
        let version = self.opts.from_version.as_ref().unwrap_or(&self.opts.csv_version);
        let path = self.csv_path(version);

        let content = if self.fs.exists(&path) {
            self.fs.read_to_string(&path)?
        } else {
            String::new()
        };
        if content.trim().is_empty() {
            if let Some(from) = &self.opts.from_version {
                tracing::warn!("FromVersion set ({from}) but CSV does not exist");
            }
            return Ok(None);
        }

        let csv = serde_yaml::from_str(&content).map_err(|source| CsvError::CsvParse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded base CSV");
        Ok(Some((csv, path)))
    }

    /// Scan every configured manifest and apply what was found
    fn update_from_manifests(&self, config: &CsvConfig, csv: &mut ClusterServiceVersion) -> Result<()> {
        let enricher = CrdEnricher::new(self.fs, self.opts.project_dir.join(&self.opts.apis_dir));
        let mut store = UpdaterStore::new().with_enricher(enricher);
        let mut others: IndexMap<GroupVersionKind, Vec<String>> = IndexMap::new();

        for path in config.manifest_paths(self.fs) {
            tracing::debug!(path = %path.display(), "scanning manifest");
            let content = self.fs.read_to_string(&path)?;
            for document in split_documents(&content) {
                let meta = type_meta_from_bytes(&document).map_err(|source| CsvError::TypeMeta {
                    path: path.clone(),
                    source,
                })?;
                let handled = store
                    .add_to_updater(&document, &meta.kind)
                    .map_err(|e| CsvError::manifest(&path, e))?;
                if !handled {
                    others.entry(meta.gvk()).or_default().push(document);
                }
            }
        }

        let cr_ids: Vec<GroupVersionKind> = store.owned_crds().cr_ids().cloned().collect();
        for id in &cr_ids {
            for document in others.get(id).into_iter().flatten() {
                store.add_cr(document)?;
            }
        }

        store.apply(csv)
    }

    /// Write each CRD as `<name>.crd.yaml` next to the CSV
    fn write_bundle_crds(&self, config: &CsvConfig) -> Result<Vec<PathBuf>> {
        let bundle_dir = self.bundle_dir(&self.opts.csv_version);
        let mut written = Vec::new();

        for path in &config.crd_cr_paths {
            let sources = if self.fs.is_dir(path) {
                manifest_paths_in(self.fs, path)?
            } else {
                vec![path.clone()]
            };
            for source in sources {
                let content = self.fs.read_to_string(&source)?;
                for document in split_documents(&content) {
                    match type_meta_from_bytes(&document) {
                        Ok(meta) if meta.kind == "CustomResourceDefinition" => {}
                        Ok(_) => continue,
                        Err(_) => {
                            tracing::info!("Skipping non-manifest file {}", source.display());
                            continue;
                        }
                    }
                    let crd: CrdManifest =
                        decode("CustomResourceDefinition", &document).map_err(|e| CsvError::manifest(&source, e))?;
                    let target = bundle_dir.join(format!("{}{CRD_FILE_EXT}", crd.name()));
                    self.fs.write(&target, document.as_bytes())?;
                    if !written.contains(&target) {
                        written.push(target);
                    }
                }
            }
        }
        Ok(written)
    }
}
