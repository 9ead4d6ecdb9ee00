//! One-hot feature encoding
//!
//! Numeric fields pass through as a single column named after the field.
//! String fields expand into one indicator column per value seen at fit time,
//! named `field=value`. Columns are sorted by name, and the layout never
//! changes after fit.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{CoreError, Result};
use crate::record::{FieldValue, Record};

/// Feature vector produced by the encoder
pub type FeatureVector = Vec<f64>;

/// Shape of an input field as observed at fit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical(BTreeSet<String>),
}

/// Fitted record-to-vector mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    feature_names: Vec<String>,
    numeric: BTreeMap<String, usize>,
    categorical: BTreeMap<String, BTreeMap<String, usize>>,
}

impl FeatureEncoder {
    /// Learn the vector layout from training records.
    pub fn fit(records: &[Record]) -> Result<Self> {
        if records.is_empty() {
            return Err(CoreError::EmptyDataset);
        }

        let mut numeric_fields: BTreeSet<String> = BTreeSet::new();
        let mut categorical_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in records {
            for (field, value) in record.iter() {
                if value.is_numeric() {
                    numeric_fields.insert(field.clone());
                } else {
                    categorical_values
                        .entry(field.clone())
                        .or_default()
                        .insert(value.as_category());
                }
            }
        }

        if let Some(field) = numeric_fields
            .iter()
            .find(|field| categorical_values.contains_key(*field))
        {
            return Err(CoreError::invalid_field(
                field.clone(),
                "mixes numeric and categorical values",
            ));
        }

        let mut names: Vec<(String, Option<(String, String)>)> = numeric_fields
            .into_iter()
            .map(|field| (field, None))
            .collect();
        for (field, values) in categorical_values {
            for value in values {
                names.push((format!("{field}={value}"), Some((field.clone(), value))));
            }
        }
        names.sort_by(|a, b| a.0.cmp(&b.0));

        let mut encoder = Self {
            feature_names: Vec::with_capacity(names.len()),
            numeric: BTreeMap::new(),
            categorical: BTreeMap::new(),
        };
        for (column, (name, origin)) in names.into_iter().enumerate() {
            match origin {
                None => {
                    encoder.numeric.insert(name.clone(), column);
                }
                Some((field, value)) => {
                    encoder.categorical.entry(field).or_default().insert(value, column);
                }
            }
            encoder.feature_names.push(name);
        }

        tracing::debug!(
            features = encoder.feature_names.len(),
            numeric = encoder.numeric.len(),
            categorical = encoder.categorical.len(),
            "fitted feature encoder"
        );

        Ok(encoder)
    }

    /// Length of every vector this encoder produces.
    pub fn dimension(&self) -> usize {
        self.feature_names.len()
    }

    /// Column names in vector order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Fields a record must carry, with their fitted shape.
    pub fn input_fields(&self) -> BTreeMap<String, FieldKind> {
        let mut fields: BTreeMap<String, FieldKind> = self
            .numeric
            .keys()
            .map(|field| (field.clone(), FieldKind::Numeric))
            .collect();
        for (field, values) in &self.categorical {
            fields.insert(
                field.clone(),
                FieldKind::Categorical(values.keys().cloned().collect()),
            );
        }
        fields
    }

    /// Check a record against the fitted fields without encoding it.
    ///
    /// Reports the first missing or ill-typed field in name order. With
    /// `reject_unknown`, a categorical value outside the fitted vocabulary is
    /// also an error.
    pub fn validate(&self, record: &Record, reject_unknown: bool) -> Result<()> {
        for (field, kind) in self.input_fields() {
            let value = record
                .get(&field)
                .ok_or_else(|| CoreError::MissingField(field.clone()))?;
            match kind {
                FieldKind::Numeric => {
                    numeric_value(&field, value)?;
                }
                FieldKind::Categorical(values) => {
                    let category = category_value(&field, value)?;
                    if reject_unknown && !values.contains(category) {
                        return Err(CoreError::UnknownCategory {
                            field,
                            value: category.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Encode one record.
    ///
    /// Unseen categorical values leave their indicator group all zero. Fields
    /// the encoder was not fit on are ignored.
    pub fn transform(&self, record: &Record) -> Result<FeatureVector> {
        let mut vector = vec![0.0; self.dimension()];

        for (field, &column) in &self.numeric {
            let value = record
                .get(field)
                .ok_or_else(|| CoreError::MissingField(field.clone()))?;
            vector[column] = numeric_value(field, value)?;
        }

        for (field, columns) in &self.categorical {
            let value = record
                .get(field)
                .ok_or_else(|| CoreError::MissingField(field.clone()))?;
            if let Some(&column) = columns.get(category_value(field, value)?) {
                vector[column] = 1.0;
            }
        }

        Ok(vector)
    }

    pub fn transform_batch(&self, records: &[Record]) -> Result<Vec<FeatureVector>> {
        records.iter().map(|record| self.transform(record)).collect()
    }
}

fn numeric_value(field: &str, value: &FieldValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| CoreError::invalid_field(field, format!("expected a number, got {value:?}")))
}

fn category_value<'a>(field: &str, value: &'a FieldValue) -> Result<&'a str> {
    match value {
        FieldValue::Str(category) => Ok(category),
        other => Err(CoreError::invalid_field(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(contract: &str, tenure: f64) -> Record {
        Record::new()
            .with("contract", contract)
            .with("tenure", tenure)
            .with("gender", "female")
    }

    fn fitted() -> FeatureEncoder {
        FeatureEncoder::fit(&[
            customer("month-to-month", 1.0),
            customer("two_year", 60.0),
            customer("one_year", 12.0),
        ])
        .unwrap()
    }

    #[test]
    fn layout_is_sorted() {
        let encoder = fitted();
        assert_eq!(
            encoder.feature_names(),
            &[
                "contract=month-to-month",
                "contract=one_year",
                "contract=two_year",
                "gender=female",
                "tenure",
            ]
        );
        assert_eq!(encoder.dimension(), 5);
    }

    #[test]
    fn transform_places_indicators_and_numbers() {
        let encoder = fitted();
        let vector = encoder.transform(&customer("two_year", 24.0)).unwrap();
        assert_eq!(vector, vec![0.0, 0.0, 1.0, 1.0, 24.0]);
    }

    #[test]
    fn unseen_category_is_all_zero() {
        let encoder = fitted();
        let vector = encoder.transform(&customer("weekly", 3.0)).unwrap();
        assert_eq!(vector, vec![0.0, 0.0, 0.0, 1.0, 3.0]);
        assert_eq!(vector.len(), encoder.dimension());
    }

    #[test]
    fn missing_field_is_named() {
        let encoder = fitted();
        let mut record = customer("two_year", 1.0);
        record.remove("contract");
        let err = encoder.transform(&record).unwrap_err();
        assert!(matches!(err, CoreError::MissingField(ref f) if f == "contract"));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let encoder = fitted();
        let record = customer("two_year", 0.0).with("tenure", "7");
        assert_eq!(encoder.transform(&record).unwrap()[4], 7.0);

        let record = customer("two_year", 0.0).with("tenure", "seven");
        assert!(matches!(
            encoder.transform(&record),
            Err(CoreError::InvalidField { ref field, .. }) if field == "tenure"
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let encoder = fitted();
        let record = customer("one_year", 2.0).with("customerid", "0001-A");
        assert_eq!(encoder.transform(&record).unwrap(), vec![0.0, 1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn validate_reports_unknown_only_when_asked() {
        let encoder = fitted();
        let record = customer("weekly", 3.0);
        assert!(encoder.validate(&record, false).is_ok());
        assert!(matches!(
            encoder.validate(&record, true),
            Err(CoreError::UnknownCategory { ref field, ref value }) if field == "contract" && value == "weekly"
        ));
    }

    #[test]
    fn numbers_in_categorical_fields_are_rejected() {
        let encoder = fitted();
        let record = customer("two_year", 1.0).with("gender", 1i64);
        for reject_unknown in [false, true] {
            assert!(matches!(
                encoder.validate(&record, reject_unknown),
                Err(CoreError::InvalidField { ref field, .. }) if field == "gender"
            ));
        }
        assert!(matches!(
            encoder.transform(&customer("two_year", 1.0).with("contract", 2.5)),
            Err(CoreError::InvalidField { ref field, .. }) if field == "contract"
        ));
    }

    #[test]
    fn mixed_field_types_fail_fit() {
        let records = vec![
            Record::new().with("totalcharges", 10.0),
            Record::new().with("totalcharges", " "),
        ];
        assert!(matches!(
            FeatureEncoder::fit(&records),
            Err(CoreError::InvalidField { ref field, .. }) if field == "totalcharges"
        ));
        assert!(matches!(FeatureEncoder::fit(&[]), Err(CoreError::EmptyDataset)));
    }

    #[test]
    fn input_fields_describe_schema() {
        let fields = fitted().input_fields();
        assert_eq!(fields.get("tenure"), Some(&FieldKind::Numeric));
        match fields.get("contract") {
            Some(FieldKind::Categorical(values)) => assert_eq!(values.len(), 3),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
