//! Canonical JSON serialization helpers.
//!
//! Object keys are sorted recursively and formatting is fixed, so exported
//! artifact descriptions can be diffed and hashed across runs.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use std::collections::BTreeMap;
use std::io::Write;

use crate::artifact::{ArtifactMetadata, ModelArtifact};
use crate::errors::Result;

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(key, val)| (key, sort_keys(val))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write `value` as two-space indented JSON with recursively sorted keys.
pub fn write_canonical_json<T, W>(writer: W, value: &T) -> serde_json::Result<()>
where
    T: Serialize,
    W: Write,
{
    let sorted = sort_keys(serde_json::to_value(value)?);
    let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"  "));
    sorted.serialize(&mut serializer)
}

/// [`write_canonical_json`] into a `String`.
pub fn canonical_json_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut buffer = Vec::new();
    write_canonical_json(&mut buffer, value)?;
    String::from_utf8(buffer).map_err(serde_json::Error::custom)
}

/// Human-readable description of a model artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub target: String,
    pub estimator: String,
    pub model_hash: String,
    pub threshold: f64,
    pub feature_count: usize,
    pub intercept: f64,
    /// Feature name to weight
    pub coefficients: BTreeMap<String, f64>,
    pub metadata: ArtifactMetadata,
}

impl ArtifactSummary {
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        let estimator = artifact.estimator();
        let coefficients = artifact
            .encoder()
            .feature_names()
            .iter()
            .cloned()
            .zip(estimator.weights().iter().copied())
            .collect();

        Ok(Self {
            target: artifact.target().to_string(),
            estimator: estimator.kind().to_string(),
            model_hash: artifact.model_hash()?,
            threshold: artifact.threshold(),
            feature_count: artifact.encoder().dimension(),
            intercept: estimator.intercept(),
            coefficients,
            metadata: artifact.metadata().clone(),
        })
    }
}
