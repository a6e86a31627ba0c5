//! CSV generation errors

use std::path::PathBuf;

use opsdk_core::{CoreError, GroupVersionKind};
use opsdk_descriptor::DescriptorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("error getting type metadata from manifest {}: {source}", path.display())]
    TypeMeta {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("error adding manifest {} to CSV updaters: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: Box<CsvError>,
    },

    #[error("failed to decode {kind} manifest: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no versions in CRD {0}")]
    NoCrdVersions(String),

    #[error("failed to get owned CRD {name} versions: {source}")]
    CrdVersions {
        name: String,
        #[source]
        source: Box<CsvError>,
    },

    #[error("failed to set CRD descriptors for {gvk}: {source}")]
    Descriptors {
        gvk: GroupVersionKind,
        #[source]
        source: DescriptorError,
    },

    #[error("install strategy ({0}) of unknown type")]
    UnknownInstallStrategy(String),

    #[error("error unmarshalling CSV {}: {source}", path.display())]
    CsvParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to unmarshal package manifest {}: {source}", path.display())]
    PackageManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("error validating package manifest {name}: {message}")]
    InvalidPackageManifest { name: String, message: String },

    #[error("error parsing CSV config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("CSV config path {} does not exist", .0.display())]
    ConfigPathNotFound(PathBuf),

    #[error("CSV version is not set")]
    MissingVersion,

    #[error("{version} is not a valid semantic version: ({source})")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("provided CSV version {version} contains bad values (parses to {parsed})")]
    BadVersion { version: String, parsed: String },

    #[error("from-version ({0}) cannot equal csv-version; set only csv-version instead")]
    SameVersion(String),

    #[error("failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },
}

impl CsvError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, source: CsvError) -> Self {
        CsvError::Manifest {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn serialize(what: &'static str, err: impl std::fmt::Display) -> Self {
        CsvError::Serialize {
            what,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CsvError>;
