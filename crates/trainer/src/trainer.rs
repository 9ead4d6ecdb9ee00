//! Training pipeline
//!
//! Shuffle, hold out a validation split, fit the encoder and estimator on
//! the training part, score the hold-out rows, then refit on every row and
//! package the result as a [`ModelArtifact`].

use churn_core::metrics::{accuracy, rmse, roc_auc};
use churn_core::{
    ArtifactMetadata, Estimator, FeatureEncoder, LinearRegression, LogisticParams,
    LogisticRegression, ModelArtifact, TargetKind, TargetTransform, DEFAULT_THRESHOLD,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::dataset::Dataset;
use crate::errors::TrainerError;

/// What the estimator predicts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Logistic regression on a binary target
    #[default]
    Classification,
    /// Ridge regression on a continuous target
    Regression,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Classification => write!(f, "classification"),
            Task::Regression => write!(f, "regression"),
        }
    }
}

/// Training configuration
#[derive(Clone, Debug)]
pub struct TrainingParams {
    pub task: Task,
    /// Inverse regularization strength for logistic regression
    pub c: f64,
    /// Ridge penalty for linear regression
    pub l2: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Share of rows held out for evaluation; `0.0` disables the split
    pub validation_fraction: f64,
    pub seed: u64,
    pub shuffle: bool,
    /// Decision threshold stored in the artifact
    pub threshold: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        let logistic = LogisticParams::default();
        Self {
            task: Task::Classification,
            c: logistic.c,
            l2: 1e-3,
            max_iter: logistic.max_iter,
            tol: logistic.tol,
            validation_fraction: 0.2,
            seed: 42,
            shuffle: true,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl TrainingParams {
    fn logistic(&self) -> LogisticParams {
        LogisticParams {
            c: self.c,
            max_iter: self.max_iter,
            tol: self.tol,
        }
    }
}

/// Summary of one training run
#[derive(Clone, Debug, Serialize)]
pub struct TrainingReport {
    pub task: Task,
    pub rows: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub feature_count: usize,
    /// Newton iterations of the final fit (logistic only)
    pub iterations: Option<usize>,
    pub converged: bool,
    /// Hold-out metrics; empty when no validation split was made
    pub metrics: BTreeMap<String, f64>,
    pub model_hash: String,
}

/// Result of [`PipelineTrainer::train`]
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

/// Fits encoder and estimator pairs from prepared datasets
pub struct PipelineTrainer {
    params: TrainingParams,
}

impl PipelineTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train an artifact on `dataset`.
    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutcome, TrainerError> {
        if dataset.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".to_string()));
        }

        let mut data = dataset.clone();
        if self.params.shuffle {
            tracing::debug!(seed = self.params.seed, "shuffling dataset");
            data.shuffle(self.params.seed);
        }

        let (train, validation) = data.split(self.params.validation_fraction)?;

        let mut metrics = BTreeMap::new();
        if !validation.is_empty() {
            tracing::info!(
                train = train.len(),
                validation = validation.len(),
                "fitting on training split"
            );
            let (encoder, estimator) = self.fit(&train)?;
            metrics = self.evaluate(&encoder, &estimator, &validation)?;
            for (name, value) in &metrics {
                tracing::info!("  validation {}: {:.4}", name, value);
            }
        }

        tracing::info!(rows = data.len(), "fitting on full dataset");
        let (encoder, estimator) = self.fit(&data)?;

        let (iterations, converged) = match &estimator {
            Estimator::Logistic(model) => (Some(model.iterations), model.converged),
            Estimator::Linear(_) => (None, true),
        };
        if !converged {
            tracing::warn!(
                max_iter = self.params.max_iter,
                "logistic regression did not converge; coefficients are from the last iteration"
            );
        }

        let feature_count = encoder.dimension();
        let metadata = ArtifactMetadata {
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
            trainer_version: crate::VERSION.to_string(),
            training_rows: data.len() as u64,
            metrics: metrics.clone(),
        };

        let artifact = ModelArtifact::new(data.target.clone(), encoder, estimator)?
            .with_threshold(self.params.threshold)?
            .with_target_transform(target_transform(&data.target_kind))
            .with_metadata(metadata);

        let report = TrainingReport {
            task: self.params.task,
            rows: data.len(),
            train_rows: train.len(),
            validation_rows: validation.len(),
            feature_count,
            iterations,
            converged,
            metrics,
            model_hash: artifact.model_hash()?,
        };

        Ok(TrainingOutcome { artifact, report })
    }

    fn fit(&self, dataset: &Dataset) -> Result<(FeatureEncoder, Estimator), TrainerError> {
        let encoder = FeatureEncoder::fit(&dataset.records).map_err(training_error)?;
        let x = encoder
            .transform_batch(&dataset.records)
            .map_err(training_error)?;

        let estimator = match self.params.task {
            Task::Classification => {
                LogisticRegression::fit(&x, &dataset.targets, self.params.logistic())
                    .map_err(training_error)?
                    .into()
            }
            Task::Regression => LinearRegression::fit(&x, &dataset.targets, self.params.l2)
                .map_err(training_error)?
                .into(),
        };

        tracing::debug!(features = encoder.dimension(), "fitted estimator");
        Ok((encoder, estimator))
    }

    fn evaluate(
        &self,
        encoder: &FeatureEncoder,
        estimator: &Estimator,
        validation: &Dataset,
    ) -> Result<BTreeMap<String, f64>, TrainerError> {
        let predictions = encoder
            .transform_batch(&validation.records)
            .and_then(|x| x.iter().map(|row| estimator.predict(row)).collect::<Result<Vec<_>, _>>())
            .map_err(training_error)?;

        let mut metrics = BTreeMap::new();
        match self.params.task {
            Task::Classification => {
                metrics.insert(
                    "accuracy".to_string(),
                    accuracy(&validation.targets, &predictions, self.params.threshold)
                        .map_err(training_error)?,
                );
                match roc_auc(&validation.targets, &predictions) {
                    Ok(auc) => {
                        metrics.insert("auc".to_string(), auc);
                    }
                    Err(err) => tracing::warn!("skipping validation AUC: {}", err),
                }
            }
            Task::Regression => {
                metrics.insert(
                    "rmse".to_string(),
                    rmse(&validation.targets, &predictions).map_err(training_error)?,
                );
            }
        }
        Ok(metrics)
    }
}

fn target_transform(kind: &TargetKind) -> TargetTransform {
    match kind {
        TargetKind::Continuous { log1p: true } => TargetTransform::Log1p,
        _ => TargetTransform::Identity,
    }
}

fn training_error(err: churn_core::CoreError) -> TrainerError {
    TrainerError::Training(err.to_string())
}
