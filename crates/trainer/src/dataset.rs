//! CSV dataset loading and preprocessing
//!
//! Reads a headered CSV file, runs it through the [`DataPreparer`] and
//! provides deterministic shuffling and hold-out splitting.

use churn_core::{DataPreparer, PrepareConfig, Record, TargetKind};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Prepared training rows with their encoded targets
#[derive(Clone, Debug)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub targets: Vec<f64>,
    /// Feature columns in header order
    pub feature_names: Vec<String>,
    /// Normalized target column name
    pub target: String,
    pub target_kind: TargetKind,
}

impl Dataset {
    /// Load and prepare a CSV file. The first line must be the header.
    pub fn from_csv<P: AsRef<Path>>(path: P, config: &PrepareConfig) -> Result<Self, TrainerError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|err| TrainerError::Dataset(format!("{}: {}", path.display(), err)))?;
        Self::from_reader(BufReader::new(file), config)
    }

    /// Same as [`Dataset::from_csv`] over any reader.
    pub fn from_reader<R: Read>(reader: R, config: &PrepareConfig) -> Result<Self, TrainerError> {
        // Ragged rows are let through so the preparer can report them by line.
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(TrainerError::Dataset("dataset is empty".to_string()));
        }

        let prepared = DataPreparer::new(config.clone())
            .prepare(&headers, &rows)
            .map_err(|err| TrainerError::Dataset(err.to_string()))?;

        tracing::debug!(
            rows = prepared.len(),
            columns = prepared.feature_names.len(),
            "prepared dataset"
        );

        Ok(Self {
            records: prepared.records,
            targets: prepared.targets,
            feature_names: prepared.feature_names,
            target: config.target.clone(),
            target_kind: config.target_kind.clone(),
        })
    }

    /// Deterministically shuffle rows using `seed`.
    pub fn shuffle(&mut self, seed: u64) {
        let order = LcgRng::new(seed).permutation(self.len());
        self.records = order.iter().map(|&i| self.records[i].clone()).collect();
        self.targets = order.iter().map(|&i| self.targets[i]).collect();
    }

    /// Split off the trailing `fraction` of rows as a validation set.
    ///
    /// Returns `(train, validation)`. A fraction of zero yields an empty
    /// validation set; the training side always keeps at least one row.
    pub fn split(&self, fraction: f64) -> Result<(Dataset, Dataset), TrainerError> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(TrainerError::Dataset(format!(
                "validation fraction must be in [0, 1), got {fraction}"
            )));
        }

        let n = self.len();
        let validation = ((n as f64) * fraction).round() as usize;
        let cut = n - validation.min(n.saturating_sub(1));

        Ok((self.slice(0, cut), self.slice(cut, n)))
    }

    fn slice(&self, start: usize, end: usize) -> Dataset {
        Dataset {
            records: self.records[start..end].to_vec(),
            targets: self.targets[start..end].to_vec(),
            feature_names: self.feature_names.clone(),
            target: self.target.clone(),
            target_kind: self.target_kind.clone(),
        }
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Share of rows whose target is `1.0`
    pub fn positive_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.targets.iter().filter(|&&t| t == 1.0).count() as f64 / self.len() as f64
    }
}
