//! Offline scoring: load an artifact and predict one JSON record.

use anyhow::{Context, Result};
use churn_core::{ModelArtifact, Record, RiskTier};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "churn-predict")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score a single customer record with a trained artifact", long_about = None)]
struct Args {
    /// Model artifact path
    #[arg(short, long, default_value = "model.bin")]
    model: PathBuf,

    /// JSON file holding one record; reads stdin when omitted
    #[arg(short, long)]
    record: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let artifact = ModelArtifact::load_from_path(&args.model)
        .with_context(|| format!("Failed to load model from {}", args.model.display()))?;

    let raw = match &args.record {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read record from stdin")?;
            buffer
        }
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("Record is not valid JSON")?;
    let record = Record::from_json_value(&value).context("Invalid record")?;

    let prediction = artifact.predict(&record).context("Prediction failed")?;
    tracing::debug!(?prediction, "scored record");

    println!("{}", serde_json::to_string_pretty(&prediction.to_json(artifact.target()))?);
    if let Some(probability) = prediction.probability() {
        let tier = RiskTier::from_probability(probability);
        eprintln!("risk: {} ({})", tier, tier.recommended_action());
    }

    Ok(())
}
