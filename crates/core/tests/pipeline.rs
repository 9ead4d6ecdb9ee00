//! End-to-end tests over the core pipeline: prepare, encode, fit, persist.

use churn_core::{
    DataPreparer, Estimator, FeatureEncoder, LogisticParams, LogisticRegression, ModelArtifact,
    Prediction, PrepareConfig, Record,
};
use proptest::prelude::*;

const HEADERS: [&str; 6] = ["customerID", "Contract", "InternetService", "tenure", "MonthlyCharges", "Churn"];

fn raw_rows() -> Vec<Vec<String>> {
    let contracts = ["Month-to-month", "One year", "Two year"];
    let internet = ["DSL", "Fiber optic", "No"];
    (0..60)
        .map(|i| {
            let contract = contracts[i % 3];
            let tenure = (i * 7) % 72 + 1;
            // Short month-to-month customers churn; long two-year ones stay.
            let churn = (contract == "Month-to-month" && tenure < 40) || (i % 11 == 0);
            vec![
                format!("{i:04}-X"),
                contract.to_string(),
                internet[(i / 3) % 3].to_string(),
                tenure.to_string(),
                format!("{:.2}", 20.0 + (i % 9) as f64 * 10.0),
                if churn { "Yes" } else { "No" }.to_string(),
            ]
        })
        .collect()
}

fn config() -> PrepareConfig {
    let mut config = PrepareConfig::telco_churn();
    config.numeric_columns = vec!["tenure".into(), "monthlycharges".into()];
    config
}

fn trained() -> ModelArtifact {
    let data = DataPreparer::new(config()).prepare(&HEADERS, &raw_rows()).unwrap();
    let encoder = FeatureEncoder::fit(&data.records).unwrap();
    let x = encoder.transform_batch(&data.records).unwrap();
    let model = LogisticRegression::fit(&x, &data.targets, LogisticParams::default()).unwrap();
    assert!(model.converged);
    ModelArtifact::new("churn", encoder, Estimator::Logistic(model)).unwrap()
}

fn customer(contract: &str, internet: &str, tenure: i64, monthly: f64) -> Record {
    Record::new()
        .with("contract", contract)
        .with("internetservice", internet)
        .with("tenure", tenure)
        .with("monthlycharges", monthly)
}

#[test]
fn prediction_is_a_probability_with_consistent_decision() {
    let artifact = trained();
    let prediction = artifact
        .predict(&customer("month-to-month", "dsl", 1, 29.85))
        .unwrap();

    match prediction {
        Prediction::Probability {
            probability,
            decision,
        } => {
            assert!((0.0..=1.0).contains(&probability));
            assert_eq!(decision, probability >= 0.5);
        }
        other => panic!("expected a probability, got {other:?}"),
    }
}

#[test]
fn round_trip_reproduces_bit_identical_predictions() {
    let artifact = trained();
    let restored = ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();

    for (contract, tenure) in [("month-to-month", 1), ("one_year", 30), ("two_year", 70), ("weekly", 5)] {
        let record = customer(contract, "fiber_optic", tenure, 80.0);
        let a = artifact.predict(&record).unwrap().probability().unwrap();
        let b = restored.predict(&record).unwrap().probability().unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn longer_tenure_does_not_raise_churn() {
    let artifact = trained();
    let short = artifact.predict(&customer("two_year", "dsl", 1, 50.0)).unwrap();
    let long = artifact.predict(&customer("two_year", "dsl", 60, 50.0)).unwrap();
    assert!(long.probability().unwrap() <= short.probability().unwrap());
}

#[test]
fn artifact_file_round_trip() {
    let artifact = trained();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    artifact.save_to_path(&path).unwrap();
    let restored = ModelArtifact::load_from_path(&path).unwrap();
    assert_eq!(restored, artifact);
}

fn contract_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("month-to-month".to_string()),
        Just("one_year".to_string()),
        Just("two_year".to_string()),
        "[a-z_]{1,12}",
    ]
}

proptest! {
    #[test]
    fn encoding_is_deterministic(contract in contract_strategy(), tenure in 0i64..100, monthly in 0.0f64..200.0) {
        let artifact = trained();
        let encoder = artifact.encoder();
        let a = encoder.transform(&customer(&contract, "dsl", tenure, monthly)).unwrap();
        let b = encoder.transform(&customer(&contract, "dsl", tenure, monthly)).unwrap();
        prop_assert_eq!(a.len(), encoder.dimension());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn unseen_contract_zeroes_its_group(value in "[a-z]{3,10}") {
        let known = ["month-to-month", "one_year", "two_year"];
        prop_assume!(!known.contains(&value.as_str()));

        let artifact = trained();
        let encoder = artifact.encoder();
        let vector = encoder.transform(&customer(&value, "dsl", 10, 40.0)).unwrap();
        for (name, v) in encoder.feature_names().iter().zip(&vector) {
            if name.starts_with("contract=") {
                prop_assert_eq!(*v, 0.0);
            }
        }
    }
}
