//! Command implementations.

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};

use cvp_core::{Buffer, Normalizer, Validator, ValidatorConfig};
use cvp_schema::{Schema, SchemaDocument};

use crate::{Cli, Commands};

/// Dispatch the parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate => cmd_validate(&cli),
        Commands::Normalize => cmd_normalize(&cli),
        Commands::Audit => cmd_audit(&cli),
        Commands::Benchmark { iterations } => cmd_benchmark(&cli, iterations),
        Commands::Version => cmd_version(),
    }
}

fn load_schema(path: Option<&Path>) -> Result<Schema> {
    match path {
        Some(path) => {
            let doc = SchemaDocument::from_path(path)
                .with_context(|| format!("loading schema {}", path.display()))?;
            Ok(doc.compile()?)
        }
        None => Ok(Schema::secure_message()),
    }
}

fn read_input(cli: &Cli) -> Result<Vec<u8>> {
    let path = cli
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("an input file is required (-i/--input)"))?;
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(cli: &Cli, bytes: &[u8]) -> Result<()> {
    match cli.output.as_deref() {
        Some(path) => {
            std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            std::io::stdout().write_all(b"\n")?;
            Ok(())
        }
    }
}

fn validator_config(cli: &Cli) -> ValidatorConfig {
    if cli.no_zero_trust {
        tracing::warn!("zero-trust enforcement disabled");
    }
    if cli.no_nasa {
        tracing::warn!("strict compliance profile disabled");
    }
    ValidatorConfig {
        zero_trust: !cli.no_zero_trust,
        strict: !cli.no_nasa,
        alpha: cli.alpha,
        beta: cli.beta,
        ..ValidatorConfig::default()
    }
}

fn cmd_validate(cli: &Cli) -> Result<()> {
    let data = read_input(cli)?;
    let schema = load_schema(cli.schema.as_deref())?;

    let audit = cvp_audit::global::init(&cli.audit_log)?;
    let mut validator = Validator::new(schema, validator_config(cli), audit)?;

    let mut buffer = Buffer::from_bytes(&data)?;
    let outcome = validator.validate(&mut buffer);
    cvp_audit::global::cleanup()?;

    match outcome {
        Ok(()) => {
            let zone = buffer.zone().map(|z| z.as_str()).unwrap_or("-");
            let cost = buffer.cost().unwrap_or(0.0);
            println!("SUCCESS zone={zone} cost={cost:.6}");
            if let Some(hash) = buffer.pattern_hash() {
                println!("pattern_hash={}", hex::encode(&hash[..4]));
            }
            Ok(())
        }
        Err(err) => {
            println!("{} {}", err.code(), err);
            bail!("validation rejected the message")
        }
    }
}

fn cmd_normalize(cli: &Cli) -> Result<()> {
    let data = read_input(cli)?;
    let schema = load_schema(cli.schema.as_deref())?;

    let normalizer = Normalizer::for_schema(&schema);
    let mut buffer = Buffer::from_bytes(&data)?;
    normalizer.normalize(&mut buffer)?;

    tracing::debug!(
        input_len = data.len(),
        canonical_len = buffer.len(),
        "reduction complete"
    );
    write_output(cli, buffer.as_slice())
}

fn cmd_audit(cli: &Cli) -> Result<()> {
    let entries = cvp_audit::verify(&cli.audit_log)
        .with_context(|| format!("verifying {}", cli.audit_log.display()))?;
    println!("audit verification successful: {entries} entries verified");
    Ok(())
}

fn cmd_benchmark(cli: &Cli, iterations: u32) -> Result<()> {
    if iterations == 0 {
        bail!("benchmark requires at least one iteration");
    }
    let data = read_input(cli)?;
    let schema = load_schema(cli.schema.as_deref())?;

    let audit = cvp_audit::global::init(&cli.audit_log)?;
    let mut validator = Validator::new(schema, validator_config(cli), audit)?;

    let mut buffer = Buffer::new();
    let start = Instant::now();
    for _ in 0..iterations {
        buffer.set_data(&data)?;
        validator.validate(&mut buffer)?;
    }
    let elapsed = start.elapsed();
    cvp_audit::global::cleanup()?;

    let per_message = elapsed / iterations;
    let throughput = f64::from(iterations) / elapsed.as_secs_f64();
    println!(
        "validated {iterations} messages in {:.3}s ({throughput:.0} msg/s, {per_message:?}/msg)",
        elapsed.as_secs_f64()
    );
    Ok(())
}

fn cmd_version() -> Result<()> {
    println!("cvp {}", env!("CARGO_PKG_VERSION"));
    println!("zero trust: enforced by default");
    println!("audit compliance: {}", cvp_audit::COMPLIANCE_TAG);
    Ok(())
}
