//! CLI error types with exit code handling
//!
//! Library errors are sorted into the few classes a caller of `gen-csv`
//! can act on, each with its own exit code.

use miette::Diagnostic;
use opsdk_core::CoreError;
use opsdk_csv::CsvError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Bad flag value or flag combination
    #[error("{message}")]
    #[diagnostic(code(operator_sdk::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Unreadable or inconsistent project input
    #[error("{message}")]
    #[diagnostic(code(operator_sdk::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A manifest or annotation could not be turned into CSV content
    #[error("{message}")]
    #[diagnostic(code(operator_sdk::cli::generation))]
    Generation { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(operator_sdk::cli::io))]
    Io { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Generation { .. } => exit_codes::GENERATION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn io(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::io(err)
    }
}

impl From<CsvError> for CliError {
    fn from(err: CsvError) -> Self {
        let message = err.to_string();
        match err {
            CsvError::MissingVersion => CliError::usage_with_help(message, "pass --csv-version, e.g. --csv-version 0.1.0"),
            CsvError::InvalidVersion { .. } | CsvError::BadVersion { .. } => {
                CliError::usage_with_help(message, "versions must be semantic versions without a leading 'v'")
            }
            CsvError::SameVersion(_) => CliError::usage(message),
            CsvError::ConfigPathNotFound(_) => CliError::Input {
                message,
                help: Some("fix or remove the path in csv-config.yaml".to_string()),
            },
            CsvError::ConfigParse { .. }
            | CsvError::PackageManifestParse { .. }
            | CsvError::InvalidPackageManifest { .. }
            | CsvError::CsvParse { .. } => CliError::Input { message, help: None },
            CsvError::Core(
                CoreError::Io { .. } | CoreError::NotFound(_) | CoreError::InvalidUtf8(_) | CoreError::LockPoisoned,
            ) => CliError::Io { message },
            _ => CliError::Generation { message },
        }
    }
}
