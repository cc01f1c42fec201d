//! `cvp`: command-line front-end for the CVP protocol engine.
//!
//! A thin translator over the core: it reads files, invokes the admission
//! pipeline in the prescribed order, and reports outcomes. All protocol
//! semantics live in `cvp-core`.
//!
//! ```bash
//! cvp validate -i message.json -s schema.yaml
//! cvp normalize -i raw.txt -o canonical.txt
//! cvp audit -a audit.log
//! cvp benchmark -i message.json -n 5000
//! ```
//!
//! Exit code 0 on success, 1 on any error.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cvp_core::{ALPHA_DEFAULT, BETA_DEFAULT};

/// CVP - canonical validation protocol tools.
///
/// Validates structured messages against a schema with mandatory canonical
/// reduction, a minimized shape recognizer, admission-cost governance, and a
/// tamper-evident audit trail.
#[derive(Parser, Debug)]
#[command(name = "cvp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Input file
    #[arg(short = 'i', long, global = true)]
    pub input: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,

    /// Schema file (defaults to the built-in secure-message schema)
    #[arg(short = 's', long, global = true)]
    pub schema: Option<PathBuf>,

    /// Audit log path
    #[arg(short = 'a', long = "audit-log", global = true, default_value = "audit.log")]
    pub audit_log: PathBuf,

    /// Disable zero-trust enforcement (requires --no-nasa)
    #[arg(long = "no-zero-trust", global = true)]
    pub no_zero_trust: bool,

    /// Disable the strict compliance profile
    #[arg(long = "no-nasa", global = true)]
    pub no_nasa: bool,

    /// KL weight for the admission cost, in [0, 1]
    #[arg(short = 'A', long, global = true, default_value_t = ALPHA_DEFAULT, value_parser = parse_weight)]
    pub alpha: f64,

    /// Entropy-change weight for the admission cost, in [0, 1]
    #[arg(short = 'B', long, global = true, default_value_t = BETA_DEFAULT, value_parser = parse_weight)]
    pub beta: f64,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a message against the schema
    Validate,

    /// Reduce a message to its canonical form
    Normalize,

    /// Verify the integrity of the audit log
    Audit,

    /// Measure validation throughput
    Benchmark {
        /// Number of validation iterations
        #[arg(short = 'n', long, default_value = "1000")]
        iterations: u32,
    },

    /// Show version and enforcement defaults
    Version,
}

/// Cost weights are constrained to [0, 1]; the engine checks their sum.
fn parse_weight(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{value} is outside [0, 1]"));
    }
    Ok(value)
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::execute(cli) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_weight_parser_bounds() {
        assert!(parse_weight("0.0").is_ok());
        assert!(parse_weight("1.0").is_ok());
        assert!(parse_weight("0.6").is_ok());
        assert!(parse_weight("1.1").is_err());
        assert!(parse_weight("-0.1").is_err());
        assert!(parse_weight("abc").is_err());
    }

    #[test]
    fn test_parse_validate_invocation() {
        let cli = Cli::parse_from([
            "cvp", "validate", "-i", "msg.json", "-s", "schema.yaml", "-A", "0.5", "-B", "0.5",
        ]);
        assert!(matches!(cli.command, Commands::Validate));
        assert_eq!(cli.alpha, 0.5);
        assert_eq!(cli.input.as_deref(), Some(std::path::Path::new("msg.json")));
    }

    #[test]
    fn test_parse_benchmark_iterations() {
        let cli = Cli::parse_from(["cvp", "benchmark", "-i", "msg.json", "-n", "250"]);
        match cli.command {
            Commands::Benchmark { iterations } => assert_eq!(iterations, 250),
            other => panic!("expected benchmark, got {other:?}"),
        }
    }
}
