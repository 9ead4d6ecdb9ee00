//! Model artifact: the fitted encoder and estimator persisted as one unit
//!
//! Byte layout: the magic `CHRN`, then a bincode envelope holding the format
//! version, a BLAKE3 checksum and the bincode-encoded artifact payload. The
//! format is not a cross-version compatibility contract.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::encoder::FeatureEncoder;
use crate::errors::{CoreError, Result};
use crate::estimator::{Estimator, EstimatorKind};
use crate::prediction::{decide, Prediction, DEFAULT_THRESHOLD};
use crate::record::Record;

/// Leading bytes of every artifact.
pub const ARTIFACT_MAGIC: &[u8; 4] = b"CHRN";

/// Envelope layout version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Target name used when an artifact is saved without one.
pub const DEFAULT_TARGET: &str = "churn";

/// Upper bound on decoded artifact size; guards against hostile length prefixes.
const MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_ARTIFACT_BYTES)
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

/// How regression targets were transformed before fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetTransform {
    #[default]
    Identity,
    /// Fitted on `ln(1 + y)`; predictions are mapped back with `exp(v) - 1`
    Log1p,
}

impl TargetTransform {
    pub fn invert(&self, value: f64) -> f64 {
        match self {
            TargetTransform::Identity => value,
            TargetTransform::Log1p => value.exp_m1(),
        }
    }
}

/// Provenance recorded at training time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Unix seconds
    pub created_at: u64,
    pub trainer_version: String,
    pub training_rows: u64,
    /// Hold-out metrics such as `auc`, `accuracy` or `rmse`
    pub metrics: BTreeMap<String, f64>,
}

/// Immutable pairing of a fitted encoder and estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    target: String,
    encoder: FeatureEncoder,
    estimator: Estimator,
    threshold: f64,
    target_transform: TargetTransform,
    metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Pair an encoder with an estimator; their dimensions must agree.
    pub fn new<T: Into<String>>(target: T, encoder: FeatureEncoder, estimator: Estimator) -> Result<Self> {
        let artifact = Self {
            target: target.into(),
            encoder,
            estimator,
            threshold: DEFAULT_THRESHOLD,
            target_transform: TargetTransform::Identity,
            metadata: ArtifactMetadata::default(),
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        self.threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    pub fn with_target_transform(mut self, transform: TargetTransform) -> Self {
        self.target_transform = transform;
        self
    }

    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Structural checks applied on construction and after every load.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(CoreError::InvalidParameter("target name is empty".to_string()));
        }
        if self.encoder.dimension() != self.estimator.dimension() {
            return Err(CoreError::DimensionMismatch {
                expected: self.encoder.dimension(),
                actual: self.estimator.dimension(),
            });
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(CoreError::InvalidParameter(format!(
                "threshold must lie in (0, 1), got {}",
                self.threshold
            )));
        }
        let coefficients_finite = self.estimator.intercept().is_finite()
            && self.estimator.weights().iter().all(|w| w.is_finite());
        if !coefficients_finite {
            return Err(CoreError::NonFinite);
        }
        Ok(())
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn target_transform(&self) -> TargetTransform {
        self.target_transform
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn into_parts(self) -> (FeatureEncoder, Estimator) {
        (self.encoder, self.estimator)
    }

    /// Encode and score one record.
    pub fn predict(&self, record: &Record) -> Result<Prediction> {
        let features = self.encoder.transform(record)?;
        let raw = self.estimator.predict(&features)?;
        let prediction = match self.estimator.kind() {
            EstimatorKind::Logistic => Prediction::Probability {
                probability: raw,
                decision: decide(raw, self.threshold),
            },
            EstimatorKind::Linear => {
                let value = self.target_transform.invert(raw);
                if !value.is_finite() {
                    return Err(CoreError::NonFinite);
                }
                Prediction::Value { value }
            }
        };
        Ok(prediction)
    }

    fn payload(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|err| CoreError::CorruptArtifact(format!("failed to encode artifact: {err}")))
    }

    /// Hex BLAKE3 digest of the encoded artifact.
    pub fn model_hash(&self) -> Result<String> {
        Ok(hex::encode(blake3::hash(&self.payload()?).as_bytes()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.payload()?;
        let envelope = Envelope {
            format_version: FORMAT_VERSION,
            checksum: *blake3::hash(&payload).as_bytes(),
            payload,
        };
        let body = codec()
            .serialize(&envelope)
            .map_err(|err| CoreError::CorruptArtifact(format!("failed to encode envelope: {err}")))?;

        let mut bytes = Vec::with_capacity(ARTIFACT_MAGIC.len() + body.len());
        bytes.extend_from_slice(ARTIFACT_MAGIC);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = bytes
            .strip_prefix(ARTIFACT_MAGIC.as_slice())
            .ok_or_else(|| CoreError::CorruptArtifact("missing artifact header".to_string()))?;

        let envelope: Envelope = codec()
            .deserialize(body)
            .map_err(|err| CoreError::CorruptArtifact(format!("undecodable envelope: {err}")))?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(CoreError::CorruptArtifact(format!(
                "unsupported format version {}",
                envelope.format_version
            )));
        }
        if blake3::hash(&envelope.payload).as_bytes() != &envelope.checksum {
            return Err(CoreError::CorruptArtifact("checksum mismatch".to_string()));
        }

        let artifact: ModelArtifact = codec()
            .deserialize(&envelope.payload)
            .map_err(|err| CoreError::CorruptArtifact(format!("undecodable payload: {err}")))?;
        artifact
            .validate()
            .map_err(|err| CoreError::CorruptArtifact(err.to_string()))?;
        Ok(artifact)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

/// Serialize an encoder/estimator pair.
pub fn save(encoder: &FeatureEncoder, estimator: &Estimator) -> Result<Vec<u8>> {
    ModelArtifact::new(DEFAULT_TARGET, encoder.clone(), estimator.clone())?.to_bytes()
}

/// Deserialize an encoder/estimator pair written by [`save`] or [`ModelArtifact::to_bytes`].
pub fn load(bytes: &[u8]) -> Result<(FeatureEncoder, Estimator)> {
    Ok(ModelArtifact::from_bytes(bytes)?.into_parts())
}
