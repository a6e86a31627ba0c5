//! operator-sdk CLI - OLM manifests for Kubernetes operators

use std::io::IsTerminal;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use error::CliError;

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "OPERATOR_SDK_LOG";

#[derive(Parser)]
#[command(name = "operator-sdk")]
#[command(version)]
#[command(about = "Generate Operator Lifecycle Manager manifests for an operator project", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or update a ClusterServiceVersion and package manifest
    GenCsv(commands::gen_csv::GenCsvArgs),
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::GenCsv(args) => commands::gen_csv::run(&args),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version come through here too
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            if err.print().is_err() {
                eprintln!("{err}");
            }
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
