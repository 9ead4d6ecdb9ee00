//! Churn pipeline trainer CLI
//!
//! Trains a model artifact from a raw CSV dataset and writes it next to a
//! BLAKE3 hash file.

use anyhow::{Context, Result};
use churn_core::serialization::{canonical_json_string, ArtifactSummary};
use churn_core::PrepareConfig;
use churn_trainer::{Dataset, PipelineTrainer, Task, TrainingParams};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "churn-train")]
#[command(author = "Churn Pipeline Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a churn model artifact from a CSV dataset", long_about = None)]
struct Args {
    /// Input CSV dataset path (first line is the header)
    #[arg(short, long)]
    input: PathBuf,

    /// Output artifact path; the hash is written to `<output>.hash`
    #[arg(short, long, default_value = "model.bin")]
    output: PathBuf,

    /// Target column
    #[arg(long, default_value = "churn")]
    target: String,

    /// Estimator family
    #[arg(long, value_enum, default_value_t = Task::Classification)]
    task: Task,

    /// Target value counted as positive (classification)
    #[arg(long, default_value = "yes")]
    positive_label: String,

    /// Numeric columns (comma separated). The Telco preset applies to the
    /// default `churn` target; otherwise they are inferred from the data
    #[arg(long, value_delimiter = ',')]
    numeric: Vec<String>,

    /// Columns excluded from the features (comma separated)
    #[arg(long, value_delimiter = ',')]
    drop: Vec<String>,

    /// Fit regression targets on ln(1 + y)
    #[arg(long)]
    log1p: bool,

    /// Inverse regularization strength (classification)
    #[arg(long, default_value = "1.0")]
    c: f64,

    /// Ridge penalty (regression)
    #[arg(long, default_value = "0.001")]
    l2: f64,

    /// Maximum Newton iterations
    #[arg(long, default_value = "100")]
    max_iter: usize,

    /// Share of rows held out for validation
    #[arg(long, default_value = "0.2")]
    validation: f64,

    /// Random seed for deterministic shuffling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Skip dataset shuffling
    #[arg(long)]
    no_shuffle: bool,

    /// Decision threshold stored in the artifact
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// Also write a canonical JSON description of the artifact
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn prepare_config(&self) -> PrepareConfig {
        let telco = PrepareConfig::telco_churn();
        let mut config = match self.task {
            Task::Classification if normalize(&self.target) == telco.target => telco,
            Task::Classification => {
                PrepareConfig::classification(&self.target, self.positive_label.as_str())
            }
            Task::Regression => PrepareConfig::regression(&self.target, Vec::new(), self.log1p),
        };
        if !self.numeric.is_empty() {
            config.numeric_columns = self.numeric.iter().map(|c| normalize(c)).collect();
        }
        config
            .drop_columns
            .extend(self.drop.iter().map(|c| normalize(c)));
        config
    }

    fn training_params(&self) -> TrainingParams {
        TrainingParams {
            task: self.task,
            c: self.c,
            l2: self.l2,
            max_iter: self.max_iter,
            validation_fraction: self.validation,
            seed: self.seed,
            shuffle: !self.no_shuffle,
            threshold: self.threshold,
            ..TrainingParams::default()
        }
    }
}

fn normalize(column: &str) -> String {
    churn_core::prepare::normalize_name(column)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Churn pipeline trainer v{}", env!("CARGO_PKG_VERSION"));

    let prepare = args.prepare_config();
    info!("Loading dataset from: {}", args.input.display());
    let dataset = Dataset::from_csv(&args.input, &prepare).context("Failed to load dataset")?;

    info!(
        "Loaded {} rows with {} feature columns (positive rate {:.3})",
        dataset.len(),
        dataset.feature_names.len(),
        dataset.positive_rate()
    );

    let params = args.training_params();
    info!("Training configuration:");
    info!("  Task: {}", params.task);
    info!("  Target: {}", prepare.target);
    info!("  C: {}  l2: {}  max_iter: {}", params.c, params.l2, params.max_iter);
    info!("  Validation fraction: {}", params.validation_fraction);
    info!("  Seed: {} (shuffle: {})", params.seed, params.shuffle);

    let outcome = PipelineTrainer::new(params)
        .train(&dataset)
        .context("Training failed")?;
    let report = &outcome.report;

    info!("Training complete!");
    info!("  Features: {}", report.feature_count);
    if let Some(iterations) = report.iterations {
        info!("  Iterations: {} (converged: {})", iterations, report.converged);
    }
    for (name, value) in &report.metrics {
        info!("  {}: {:.4}", name, value);
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    info!("Saving model to: {}", args.output.display());
    outcome
        .artifact
        .save_to_path(&args.output)
        .context("Failed to write model file")?;

    let mut hash_path = args.output.clone().into_os_string();
    hash_path.push(".hash");
    let hash_path = PathBuf::from(hash_path);
    std::fs::write(&hash_path, &report.model_hash).context("Failed to write hash file")?;

    if let Some(json_path) = &args.export_json {
        let summary = ArtifactSummary::from_artifact(&outcome.artifact)
            .context("Failed to summarize model")?;
        let json = canonical_json_string(&summary).context("Failed to serialize model summary")?;
        std::fs::write(json_path, json).context("Failed to write JSON export")?;
        info!("Exported summary to: {}", json_path.display());
    }

    info!("✓ Training completed successfully");
    info!("  Model: {}", args.output.display());
    info!("  Hash: {} ({})", hash_path.display(), report.model_hash);

    Ok(())
}
