//! Churn pipeline trainer
//!
//! Loads a raw CSV dataset, prepares and encodes it, fits a linear or
//! logistic estimator and packages the result as a model artifact.
//! Shuffling and splitting are seeded so repeated runs produce identical
//! artifacts.

pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod trainer;

use churn_core::{ModelArtifact, PrepareConfig};
use std::path::Path;

pub use dataset::Dataset;
pub use deterministic::LcgRng;
pub use errors::TrainerError;
pub use trainer::{PipelineTrainer, Task, TrainingOutcome, TrainingParams, TrainingReport};

/// Train an artifact directly from a CSV file using the provided settings.
pub fn train_artifact_from_csv(
    path: &Path,
    prepare: &PrepareConfig,
    params: TrainingParams,
) -> Result<ModelArtifact, TrainerError> {
    let dataset = Dataset::from_csv(path, prepare)?;
    let outcome = PipelineTrainer::new(params).train(&dataset)?;
    Ok(outcome.artifact)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
