//! ClusterServiceVersion generation for operator-sdk
//!
//! Builds or updates an operator's CSV from the manifests in its project:
//! - Role and ClusterRole manifests become install strategy permissions
//! - the operator Deployment becomes the install strategy deployment
//! - CRDs become owned CRD entries, described from the Go API types
//! - custom resources of owned CRDs become `alm-examples`
//!
//! An existing CSV is updated in place: user edits to owned CRD entries are
//! kept, and a new version chains the old CSV through `spec.replaces`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod generator;
pub mod manifests;
pub mod package_manifest;
pub mod types;
pub mod updaters;
pub mod version;

pub use config::{CSV_CONFIG_FILE, CsvConfig, CsvConfigFile};
pub use defaults::{empty_required_fields, set_csv_default_fields};
pub use error::{CsvError, Result};
pub use generator::{CsvGenerator, CsvSource, GenCsvOptions, GenerateReport, OLM_CATALOG_DIR};
pub use package_manifest::{PackageChannel, PackageManifest, generate_package_manifest};
pub use types::{ClusterServiceVersion, CsvSpec, csv_name};
pub use updaters::{CrdEnricher, CsvUpdater, UpdaterStore};
pub use version::{check_from_version, parse_csv_version, update_csv_version};
