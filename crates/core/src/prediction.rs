//! Prediction results and the decisions derived from them

use serde_json::{Map, Value};
use std::fmt;

/// Default probability threshold for the positive decision.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Positive decision iff `probability >= threshold`; ties go positive.
pub fn decide(probability: f64, threshold: f64) -> bool {
    probability >= threshold
}

/// Outcome of running one record through an artifact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Probability { probability: f64, decision: bool },
    Value { value: f64 },
}

impl Prediction {
    pub fn probability(&self) -> Option<f64> {
        match self {
            Prediction::Probability { probability, .. } => Some(*probability),
            Prediction::Value { .. } => None,
        }
    }

    pub fn decision(&self) -> Option<bool> {
        match self {
            Prediction::Probability { decision, .. } => Some(*decision),
            Prediction::Value { .. } => None,
        }
    }

    /// Regression output, already mapped back to the target's scale.
    pub fn value(&self) -> Option<f64> {
        match self {
            Prediction::Probability { .. } => None,
            Prediction::Value { value } => Some(*value),
        }
    }

    /// Response body keyed by target name.
    ///
    /// Classifiers render `{"<target>_probability": p, "<target>": bool}`,
    /// regressors render `{"<target>": value}`.
    pub fn to_json(&self, target: &str) -> Value {
        let mut body = Map::new();
        match self {
            Prediction::Probability {
                probability,
                decision,
            } => {
                body.insert(format!("{target}_probability"), Value::from(*probability));
                body.insert(target.to_string(), Value::Bool(*decision));
            }
            Prediction::Value { value } => {
                body.insert(target.to_string(), Value::from(*value));
            }
        }
        Value::Object(body)
    }
}

/// Retention action bucket for a churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskTier {
    VeryLow,
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.7 {
            RiskTier::High
        } else if probability >= 0.5 {
            RiskTier::Medium
        } else if probability >= 0.3 {
            RiskTier::Low
        } else {
            RiskTier::VeryLow
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            RiskTier::High => "send immediate retention offer",
            RiskTier::Medium => "contact with special offer",
            RiskTier::Low => "regular engagement campaign",
            RiskTier::VeryLow => "standard communication",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::High => "high",
            RiskTier::Medium => "medium",
            RiskTier::Low => "low",
            RiskTier::VeryLow => "very low",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_is_positive() {
        assert!(decide(0.5, DEFAULT_THRESHOLD));
        assert!(!decide(0.5 - f64::EPSILON, DEFAULT_THRESHOLD));
        assert!(decide(1.0, DEFAULT_THRESHOLD));
        assert!(!decide(0.0, DEFAULT_THRESHOLD));
    }

    #[test]
    fn classifier_json_shape() {
        let prediction = Prediction::Probability {
            probability: 0.25,
            decision: false,
        };
        let body = prediction.to_json("churn");
        assert_eq!(body["churn_probability"], 0.25);
        assert_eq!(body["churn"], false);
        assert_eq!(body.as_object().unwrap().len(), 2);
    }

    #[test]
    fn regressor_json_shape() {
        let body = Prediction::Value { value: 31_000.0 }.to_json("msrp");
        assert_eq!(body["msrp"], 31_000.0);
    }

    #[test]
    fn risk_tiers() {
        assert_eq!(RiskTier::from_probability(0.85), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.7), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.5), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.3), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.1), RiskTier::VeryLow);
        assert!(RiskTier::High > RiskTier::Low);
    }
}
