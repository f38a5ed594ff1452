use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use medwire_core::canonical::{CanonicalRecord, Claim, EligibilityRequest, LabOrder};
use medwire_core::{Codec, CodecConfig, Decoded};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medwire")]
#[command(about = "Convert records between the canonical model, FHIR R4, X12 and HL7 v2")]
struct Cli {
    /// Codec configuration file (YAML)
    #[arg(long, global = true, env = "MEDWIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a canonical record (YAML) as a FHIR R4 resource
    ToFhir {
        /// Record file, or `-` for stdin
        input: PathBuf,
    },
    /// Read a FHIR R4 resource into a partial canonical record
    FromFhir { input: PathBuf },
    /// Build an X12 270 eligibility inquiry from a request (YAML)
    EligibilityInquiry { input: PathBuf },
    /// Parse an X12 271 eligibility response
    EligibilityResponse { input: PathBuf },
    /// Build one X12 837 interchange per claim from a YAML list of claims
    Claim {
        input: PathBuf,
        /// Write each interchange to `<dir>/<claim id>.x12` instead of stdout
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Parse an X12 277 claim status response
    ClaimStatus { input: PathBuf },
    /// Parse every 835 remittance advice in an X12 file
    Remittance { input: PathBuf },
    /// Build an HL7 v2 ORM^O01 lab order from an order (YAML)
    LabOrder { input: PathBuf },
    /// Parse an HL7 v2 ORU^R01 lab result
    LabResult { input: PathBuf },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'medwire --help' for commands");
        return Ok(());
    };

    let codec = codec(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::ToFhir { input } => {
            let record: CanonicalRecord = read_yaml(&input)?;
            let resource = codec.to_fhir(&record)?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&resource)?)?;
        }
        Commands::FromFhir { input } => {
            let text = String::from_utf8(read_input(&input)?)
                .with_context(|| format!("{} is not UTF-8", input.display()))?;
            print_decoded(&mut stdout, codec.from_fhir(&text)?)?;
        }
        Commands::EligibilityInquiry { input } => {
            let request: EligibilityRequest = read_yaml(&input)?;
            stdout.write_all(&codec.build_eligibility_inquiry(&request)?)?;
        }
        Commands::EligibilityResponse { input } => {
            print_decoded(&mut stdout, codec.parse_eligibility_response(&read_input(&input)?)?)?;
        }
        Commands::Claim { input, out_dir } => {
            let claims: Vec<Claim> = read_yaml(&input)?;
            let batch = codec.build_claim_batch(&claims);
            for (item, interchange) in batch.successes() {
                match &out_dir {
                    Some(dir) => {
                        let path = dir.join(interchange_file_name(&item.id));
                        std::fs::write(&path, interchange)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        tracing::info!(claim = %item.id, path = %path.display(), "wrote claim interchange");
                    }
                    None => {
                        stdout.write_all(interchange)?;
                        writeln!(stdout)?;
                    }
                }
            }
            for (item, err) in batch.failures() {
                eprintln!("claim {} (#{}) failed: {err}", item.id, item.index + 1);
            }
            if !batch.is_complete() {
                bail!(
                    "{} of {} claims failed",
                    batch.failure_count(),
                    batch.items.len()
                );
            }
        }
        Commands::ClaimStatus { input } => {
            print_decoded(&mut stdout, codec.parse_claim_status(&read_input(&input)?)?)?;
        }
        Commands::Remittance { input } => {
            let Decoded { value: batch, warnings } =
                codec.parse_remittance_batch(&read_input(&input)?)?;
            report_warnings(&warnings);
            let mut advices = Vec::new();
            for (item, decoded) in batch.successes() {
                report_warnings(&decoded.warnings);
                advices.push(&decoded.value);
                tracing::debug!(control = %item.id, "parsed remittance transaction");
            }
            writeln!(stdout, "{}", serde_json::to_string_pretty(&advices)?)?;
            for (item, err) in batch.failures() {
                eprintln!("transaction {} failed: {err}", item.id);
            }
            if !batch.is_complete() {
                bail!(
                    "{} of {} remittance transactions failed",
                    batch.failure_count(),
                    batch.items.len()
                );
            }
        }
        Commands::LabOrder { input } => {
            let order: LabOrder = read_yaml(&input)?;
            stdout.write_all(codec.build_lab_order(&order)?.as_bytes())?;
        }
        Commands::LabResult { input } => {
            print_decoded(&mut stdout, codec.parse_lab_result(&read_input(&input)?)?)?;
        }
    }

    Ok(())
}

fn codec(config_path: Option<&Path>) -> anyhow::Result<Codec> {
    let Some(path) = config_path else {
        bail!("no configuration given; pass --config or set MEDWIRE_CONFIG");
    };
    let config = CodecConfig::load(path)?;
    Ok(Codec::new(Arc::new(config)))
}

/// Reads a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = read_input(path)?;
    serde_yaml::from_slice(&bytes).with_context(|| format!("{} is not a valid record", path.display()))
}

fn print_decoded<T: Serialize>(out: &mut impl Write, decoded: Decoded<T>) -> anyhow::Result<()> {
    report_warnings(&decoded.warnings);
    writeln!(out, "{}", serde_json::to_string_pretty(&decoded.value)?)?;
    Ok(())
}

fn report_warnings(warnings: &[medwire_core::Warning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn interchange_file_name(claim_id: &str) -> String {
    let stem: String = claim_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.x12")
}
