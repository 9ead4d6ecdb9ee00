//! Churn pipeline core
//!
//! Turns raw tabular customer records into predictions with a fitted
//! one-hot encoder and a linear or logistic estimator, and persists the two
//! together as a single model artifact.
//!
//! Modules:
//! - `record`: Field values and records
//! - `prepare`: Column/value normalization, numeric coercion, target encoding
//! - `encoder`: One-hot feature encoder with a fixed vector layout
//! - `estimator`: Linear (ridge) and logistic regression
//! - `linalg`: Dense solver backing the estimators
//! - `artifact`: Persisted (encoder, estimator) pair
//! - `prediction`: Prediction results, decision threshold, risk tiers
//! - `metrics`: Hold-out evaluation
//! - `serialization`: Canonical JSON export

pub mod artifact;
pub mod encoder;
pub mod errors;
pub mod estimator;
pub mod linalg;
pub mod metrics;
pub mod prediction;
pub mod prepare;
pub mod record;
pub mod serialization;

pub use artifact::{load, save, ArtifactMetadata, ModelArtifact, TargetTransform};
pub use encoder::{FeatureEncoder, FeatureVector, FieldKind};
pub use errors::{CoreError, Result};
pub use estimator::{Estimator, EstimatorKind, LinearRegression, LogisticParams, LogisticRegression};
pub use prediction::{decide, Prediction, RiskTier, DEFAULT_THRESHOLD};
pub use prepare::{DataPreparer, PrepareConfig, PreparedData, TargetKind};
pub use record::{FieldValue, Record};
pub use serialization::{canonical_json_string, ArtifactSummary};

/// Crate version string recorded in artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
