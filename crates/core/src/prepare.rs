//! Data preparation: raw tabular rows into uniform records
//!
//! Column names and categorical values are lowercased with whitespace runs
//! collapsed to `_`; numeric placeholders that do not parse become `0.0`;
//! the target is encoded as `{0, 1}` (binary) or a float (continuous).
//! When no numeric columns are configured they are inferred: a feature column
//! is numeric when every non-blank cell parses as a finite number.
//! Out-of-vocabulary categorical values are not checked here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{CoreError, Result};
use crate::record::{FieldValue, Record};

/// How the target column is turned into a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetKind {
    /// `1.0` when the normalized cell equals the normalized positive label
    Binary { positive_label: String },
    /// Numeric target, optionally log-transformed with `ln(1 + y)`
    Continuous { log1p: bool },
}

/// Preparation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Target column (normalized name)
    pub target: String,
    pub target_kind: TargetKind,
    /// Columns coerced to floats; empty means infer from the cells
    pub numeric_columns: Vec<String>,
    /// Columns never used as features
    pub drop_columns: Vec<String>,
    /// Explicit feature list; `None` uses every remaining column
    pub feature_columns: Option<Vec<String>>,
}

impl PrepareConfig {
    /// Preset for the Telco customer churn dataset.
    pub fn telco_churn() -> Self {
        Self {
            target: "churn".to_string(),
            target_kind: TargetKind::Binary {
                positive_label: "yes".to_string(),
            },
            numeric_columns: vec![
                "tenure".to_string(),
                "monthlycharges".to_string(),
                "totalcharges".to_string(),
                "seniorcitizen".to_string(),
            ],
            drop_columns: vec!["customerid".to_string()],
            feature_columns: None,
        }
    }

    /// Binary classification on any target. Numeric columns are inferred.
    pub fn classification<T: Into<String>, L: Into<String>>(target: T, positive_label: L) -> Self {
        Self {
            target: normalize_name(&target.into()),
            target_kind: TargetKind::Binary {
                positive_label: positive_label.into(),
            },
            numeric_columns: Vec::new(),
            drop_columns: Vec::new(),
            feature_columns: None,
        }
    }

    /// Generic regression preset. Columns named in `numeric_columns` are
    /// numeric; an empty list infers them from the cells.
    pub fn regression<T: Into<String>>(target: T, numeric_columns: Vec<String>, log1p: bool) -> Self {
        Self {
            target: normalize_name(&target.into()),
            target_kind: TargetKind::Continuous { log1p },
            numeric_columns,
            drop_columns: Vec::new(),
            feature_columns: None,
        }
    }
}

/// Normalized records ready for encoder fitting
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub records: Vec<Record>,
    pub targets: Vec<f64>,
    /// Feature columns in header order
    pub feature_names: Vec<String>,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lowercase, trim and collapse internal whitespace runs to `_`.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Categorical cells follow the same normalization as column names.
pub fn normalize_value(raw: &str) -> String {
    normalize_name(raw)
}

/// Parse a numeric cell; blanks and non-numeric placeholders become `0.0`.
pub fn coerce_numeric(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Encode one target cell according to `kind`.
pub fn encode_target(raw: &str, kind: &TargetKind) -> f64 {
    match kind {
        TargetKind::Binary { positive_label } => {
            if normalize_value(raw) == normalize_value(positive_label) {
                1.0
            } else {
                0.0
            }
        }
        TargetKind::Continuous { log1p } => {
            let value = coerce_numeric(raw);
            if *log1p {
                value.ln_1p()
            } else {
                value
            }
        }
    }
}

/// Turns raw rows into records according to a [`PrepareConfig`]
#[derive(Debug, Clone)]
pub struct DataPreparer {
    config: PrepareConfig,
}

impl DataPreparer {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepareConfig {
        &self.config
    }

    /// Normalize `rows` whose cells line up with `headers`.
    pub fn prepare<H: AsRef<str>, C: AsRef<str>>(
        &self,
        headers: &[H],
        rows: &[Vec<C>],
    ) -> Result<PreparedData> {
        let headers: Vec<String> = headers.iter().map(|h| normalize_name(h.as_ref())).collect();

        let target_idx = headers
            .iter()
            .position(|h| *h == self.config.target)
            .ok_or_else(|| CoreError::MissingColumn(self.config.target.clone()))?;

        for column in &self.config.numeric_columns {
            if !headers.contains(column) {
                return Err(CoreError::MissingColumn(column.clone()));
            }
        }

        let dropped: BTreeSet<&str> = self.config.drop_columns.iter().map(String::as_str).collect();

        let feature_idx: Vec<usize> = match &self.config.feature_columns {
            Some(columns) => columns
                .iter()
                .map(|column| {
                    let column = normalize_name(column);
                    headers
                        .iter()
                        .position(|h| *h == column)
                        .ok_or(CoreError::MissingColumn(column))
                })
                .collect::<Result<_>>()?,
            None => (0..headers.len())
                .filter(|&i| i != target_idx && !dropped.contains(headers[i].as_str()))
                .collect(),
        };

        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(CoreError::RaggedRow {
                    row: row_idx + 1,
                    expected: headers.len(),
                    actual: row.len(),
                });
            }
        }

        let numeric: BTreeSet<&str> = if self.config.numeric_columns.is_empty() {
            let inferred: BTreeSet<&str> = feature_idx
                .iter()
                .filter(|&&i| is_numeric_column(rows, i))
                .map(|&i| headers[i].as_str())
                .collect();
            tracing::info!(columns = ?inferred, "inferred numeric columns");
            inferred
        } else {
            self.config.numeric_columns.iter().map(String::as_str).collect()
        };

        let mut records = Vec::with_capacity(rows.len());
        let mut targets = Vec::with_capacity(rows.len());

        for row in rows {
            let mut record = Record::new();
            for &i in &feature_idx {
                let name = &headers[i];
                let cell = row[i].as_ref();
                let value = if numeric.contains(name.as_str()) {
                    FieldValue::Float(coerce_numeric(cell))
                } else {
                    FieldValue::Str(normalize_value(cell))
                };
                record.insert(name.clone(), value);
            }

            records.push(record);
            targets.push(encode_target(row[target_idx].as_ref(), &self.config.target_kind));
        }

        Ok(PreparedData {
            records,
            targets,
            feature_names: feature_idx.iter().map(|&i| headers[i].clone()).collect(),
        })
    }
}

/// A column is numeric when it has at least one non-blank cell and every
/// non-blank cell parses as a finite number.
fn is_numeric_column<C: AsRef<str>>(rows: &[Vec<C>], column: usize) -> bool {
    let mut cells = rows
        .iter()
        .map(|row| row[column].as_ref().trim())
        .filter(|cell| !cell.is_empty())
        .peekable();
    cells.peek().is_some()
        && cells.all(|cell| cell.parse::<f64>().map_or(false, |value| value.is_finite()))
}
