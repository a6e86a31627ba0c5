//! gen-csv command - write an operator's ClusterServiceVersion

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use opsdk_core::OsFileSystem;
use opsdk_csv::{CsvGenerator, CsvSource, GenCsvOptions, check_from_version, parse_csv_version};

use crate::error::CliError;

#[derive(Args, Debug, Clone)]
pub struct GenCsvArgs {
    /// Semantic version of the CSV to generate
    #[arg(long)]
    pub csv_version: Option<String>,

    /// Semantic version of an existing CSV to upgrade from
    #[arg(long)]
    pub from_version: Option<String>,

    /// Operator name (default: the project directory's name)
    #[arg(long)]
    pub operator_name: Option<String>,

    /// Path to the CSV config file, relative to the project directory
    #[arg(long, default_value = "deploy/olm-catalog/csv-config.yaml")]
    pub csv_config: PathBuf,

    /// Operator project root
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Directory holding the Go API types, relative to the project directory
    #[arg(long, default_value = "pkg/apis")]
    pub apis_dir: PathBuf,

    /// Package manifest channel the new CSV is published to
    #[arg(long)]
    pub csv_channel: Option<String>,

    /// Make --csv-channel the package's default channel
    #[arg(long)]
    pub default_channel: bool,

    /// Copy the project's CRD manifests next to the new CSV
    #[arg(long)]
    pub update_crds: bool,
}

impl GenCsvArgs {
    fn to_options(&self) -> Result<GenCsvOptions, CliError> {
        let csv_version = parse_csv_version(self.csv_version.as_deref().unwrap_or_default())?;
        let from_version = match self.from_version.as_deref().filter(|v| !v.is_empty()) {
            Some(from) => {
                let from = parse_csv_version(from)?;
                check_from_version(&csv_version, &from)?;
                Some(from)
            }
            None => None,
        };

        let channel = self.csv_channel.clone().filter(|c| !c.is_empty());
        if self.default_channel && channel.is_none() {
            return Err(CliError::usage_with_help(
                "default-channel can only be used if csv-channel is set",
                "pass --csv-channel <name> together with --default-channel",
            ));
        }

        let operator_name = match self.operator_name.clone().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => project_name(&self.project_dir)?,
        };

        let mut opts = GenCsvOptions::new(operator_name, csv_version);
        opts.from_version = from_version;
        opts.project_dir = self.project_dir.clone();
        opts.config_path = self.csv_config.clone();
        opts.apis_dir = self.apis_dir.clone();
        opts.channel = channel;
        opts.default_channel = self.default_channel;
        opts.update_crds = self.update_crds;
        Ok(opts)
    }
}

/// Base name of the project directory, resolving `.` and symlinks first
fn project_name(project_dir: &Path) -> Result<String, CliError> {
    let abs = project_dir.canonicalize()?;
    abs.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::usage_with_help(
                format!("cannot derive an operator name from {}", abs.display()),
                "pass --operator-name",
            )
        })
}

pub fn run(args: &GenCsvArgs) -> Result<(), CliError> {
    let opts = args.to_options()?;
    tracing::info!("Generating CSV manifest version {}", opts.csv_version);

    let fs = OsFileSystem;
    let generator = CsvGenerator::new(&fs, opts);
    let report = generator.generate()?;

    let verb = match &report.source {
        CsvSource::New => "Created",
        CsvSource::Existing(_) => "Updated",
    };
    println!("{} {} {}", style("✓").green(), verb, report.csv_path.display());
    if let CsvSource::Existing(from) = &report.source {
        if from != &report.csv_path {
            println!("  {} from {}", style("→").blue(), from.display());
        }
    }
    println!(
        "{} Package manifest {}",
        style("✓").green(),
        report.package_manifest_path.display()
    );
    for crd in &report.crd_paths {
        println!("  {} {}", style("→").blue(), crd.display());
    }
    if !report.missing_fields.is_empty() {
        println!(
            "{} {} required field(s) still empty: {}",
            style("⚠").yellow(),
            report.missing_fields.len(),
            report.missing_fields.join(", ")
        );
    }

    Ok(())
}
