//! Linear and logistic estimators
//!
//! Both models are an intercept plus one weight per encoded feature.
//! Fitting is sequential and deterministic: identical inputs give
//! bit-identical weights.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{CoreError, Result};
use crate::linalg::{dot, solve};

/// Ridge added to the unpenalized intercept so perfectly separated data
/// still yields an invertible Hessian.
const INTERCEPT_JITTER: f64 = 1e-10;

/// Maximum number of step halvings per Newton iteration.
const MAX_LINE_SEARCH: usize = 30;

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Negative log-likelihood of one observation with logit `z`.
fn log_loss(z: f64, y: f64) -> f64 {
    softplus(z) - y * z
}

fn check_design(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(CoreError::EmptyDataset);
    }
    if x.len() != y.len() {
        return Err(CoreError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    let dim = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != dim) {
        return Err(CoreError::DimensionMismatch {
            expected: dim,
            actual: row.len(),
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::InvalidTarget("non-finite target value".to_string()));
    }
    Ok(dim)
}

/// Which model family an estimator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorKind {
    Linear,
    Logistic,
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Linear => f.write_str("linear"),
            EstimatorKind::Logistic => f.write_str("logistic"),
        }
    }
}

/// Ordinary least squares with optional L2 penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub weights: Vec<f64>,
    pub l2: f64,
}

impl LinearRegression {
    /// Solve `(XᵀX + l2·I) w = Xᵀy` on the intercept-augmented design.
    ///
    /// The penalty applies to every coefficient including the intercept.
    pub fn fit(x: &[Vec<f64>], y: &[f64], l2: f64) -> Result<Self> {
        if !(l2.is_finite() && l2 >= 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "l2 must be a non-negative number, got {l2}"
            )));
        }
        let dim = check_design(x, y)?;
        let size = dim + 1;

        let mut xtx = vec![vec![0.0; size]; size];
        let mut xty = vec![0.0; size];

        for (row, &target) in x.iter().zip(y) {
            xtx[0][0] += 1.0;
            xty[0] += target;
            for j in 0..dim {
                let xj = row[j];
                xtx[0][j + 1] += xj;
                xty[j + 1] += xj * target;
                for k in j..dim {
                    xtx[j + 1][k + 1] += xj * row[k];
                }
            }
        }

        for j in 0..size {
            for k in 0..j {
                xtx[j][k] = xtx[k][j];
            }
            xtx[j][j] += l2;
        }

        let solution = solve(xtx, xty)?;
        Ok(Self {
            intercept: solution[0],
            weights: solution[1..].to_vec(),
            l2,
        })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept + dot(&self.weights, features)
    }
}

/// Hyper-parameters for [`LogisticRegression::fit`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength; the penalty is `‖w‖² / (2C)`
    pub c: f64,
    pub max_iter: usize,
    /// Stop once no coefficient moves by more than this
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-6,
        }
    }
}

/// L2-regularized logistic regression fit by Newton-Raphson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    pub weights: Vec<f64>,
    pub c: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticRegression {
    /// Fit on `y ∈ {0, 1}`; both classes must be present.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: LogisticParams) -> Result<Self> {
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "C must be a positive number, got {}",
                params.c
            )));
        }
        let dim = check_design(x, y)?;

        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(CoreError::InvalidTarget("labels must be 0 or 1".to_string()));
        }
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == y.len() {
            return Err(CoreError::InvalidTarget(
                "both classes must be present".to_string(),
            ));
        }

        let lambda = 1.0 / params.c;
        let size = dim + 1;

        let rate = positives as f64 / y.len() as f64;
        let mut intercept = (rate / (1.0 - rate)).ln();
        let mut weights = vec![0.0; dim];
        let mut objective = Self::objective(x, y, intercept, &weights, lambda);

        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..params.max_iter {
            iterations += 1;

            let mut gradient = vec![0.0; size];
            let mut hessian = vec![vec![0.0; size]; size];

            for (row, &target) in x.iter().zip(y) {
                let p = sigmoid(intercept + dot(&weights, row));
                let residual = p - target;
                let curvature = p * (1.0 - p);

                gradient[0] += residual;
                hessian[0][0] += curvature;
                for j in 0..dim {
                    let xj = row[j];
                    if xj == 0.0 {
                        continue;
                    }
                    gradient[j + 1] += residual * xj;
                    hessian[0][j + 1] += curvature * xj;
                    let scaled = curvature * xj;
                    for k in j..dim {
                        hessian[j + 1][k + 1] += scaled * row[k];
                    }
                }
            }

            hessian[0][0] += INTERCEPT_JITTER;
            for j in 0..dim {
                gradient[j + 1] += lambda * weights[j];
                hessian[j + 1][j + 1] += lambda;
            }
            for j in 0..size {
                for k in 0..j {
                    hessian[j][k] = hessian[k][j];
                }
            }

            let direction = solve(hessian, gradient)?;

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_LINE_SEARCH {
                let next_intercept = intercept - step * direction[0];
                let next_weights: Vec<f64> = weights
                    .iter()
                    .zip(&direction[1..])
                    .map(|(w, d)| w - step * d)
                    .collect();
                let next_objective = Self::objective(x, y, next_intercept, &next_weights, lambda);
                if next_objective <= objective {
                    accepted = Some((next_intercept, next_weights, next_objective));
                    break;
                }
                step *= 0.5;
            }

            let Some((next_intercept, next_weights, next_objective)) = accepted else {
                // No descent along the Newton direction: already at the optimum
                // up to floating point precision.
                converged = true;
                break;
            };

            let max_change = direction
                .iter()
                .fold(0.0_f64, |acc, d| acc.max((step * d).abs()));

            intercept = next_intercept;
            weights = next_weights;
            objective = next_objective;

            if max_change < params.tol {
                converged = true;
                break;
            }
        }

        Ok(Self {
            intercept,
            weights,
            c: params.c,
            iterations,
            converged,
        })
    }

    fn objective(x: &[Vec<f64>], y: &[f64], intercept: f64, weights: &[f64], lambda: f64) -> f64 {
        let loss: f64 = x
            .iter()
            .zip(y)
            .map(|(row, &target)| log_loss(intercept + dot(weights, row), target))
            .sum();
        let penalty: f64 = weights.iter().map(|w| w * w).sum();
        loss + 0.5 * lambda * penalty
    }

    /// Log-odds for a feature vector.
    pub fn decision_function(&self, features: &[f64]) -> f64 {
        self.intercept + dot(&self.weights, features)
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.decision_function(features))
    }
}

/// A fitted model mapping encoded vectors to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    Linear(LinearRegression),
    Logistic(LogisticRegression),
}

impl Estimator {
    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Linear(_) => EstimatorKind::Linear,
            Estimator::Logistic(_) => EstimatorKind::Logistic,
        }
    }

    /// Number of features the estimator expects.
    pub fn dimension(&self) -> usize {
        match self {
            Estimator::Linear(model) => model.weights.len(),
            Estimator::Logistic(model) => model.weights.len(),
        }
    }

    pub fn intercept(&self) -> f64 {
        match self {
            Estimator::Linear(model) => model.intercept,
            Estimator::Logistic(model) => model.intercept,
        }
    }

    pub fn weights(&self) -> &[f64] {
        match self {
            Estimator::Linear(model) => &model.weights,
            Estimator::Logistic(model) => &model.weights,
        }
    }

    /// Probability for logistic models, raw value for linear ones.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.dimension() {
            return Err(CoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: features.len(),
            });
        }
        let value = match self {
            Estimator::Linear(model) => model.predict(features),
            Estimator::Logistic(model) => model.predict_proba(features),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CoreError::NonFinite)
        }
    }
}

impl From<LinearRegression> for Estimator {
    fn from(model: LinearRegression) -> Self {
        Estimator::Linear(model)
    }
}

impl From<LogisticRegression> for Estimator {
    fn from(model: LogisticRegression) -> Self {
        Estimator::Logistic(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_stable_and_symmetric() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-15);
        assert!(softplus(1000.0).is_finite());
    }

    #[test]
    fn linear_recovers_exact_relationship() {
        // y = 1 + 2a - 3b
        let x = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 1.0],
            vec![3.0, 5.0],
        ];
        let y: Vec<f64> = x.iter().map(|r| 1.0 + 2.0 * r[0] - 3.0 * r[1]).collect();

        let model = LinearRegression::fit(&x, &y, 0.0).unwrap();
        assert!((model.intercept - 1.0).abs() < 1e-9);
        assert!((model.weights[0] - 2.0).abs() < 1e-9);
        assert!((model.weights[1] + 3.0).abs() < 1e-9);
    }

    #[test]
    fn ridge_handles_collinear_columns() {
        // Second column duplicates the first: plain OLS is singular.
        let x = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let y = vec![2.0, 4.0, 6.0];

        assert!(matches!(
            LinearRegression::fit(&x, &y, 0.0),
            Err(CoreError::SingularMatrix(_))
        ));
        let model = LinearRegression::fit(&x, &y, 0.001).unwrap();
        assert!((model.predict(&[2.0, 2.0]) - 4.0).abs() < 0.01);
    }

    #[test]
    fn logistic_separates_simple_classes() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }).collect();

        let model = LogisticRegression::fit(&x, &y, LogisticParams::default()).unwrap();
        assert!(model.converged);
        assert!(model.weights[0] > 0.0);
        assert!(model.predict_proba(&[0.0]) < 0.5);
        assert!(model.predict_proba(&[19.0]) > 0.5);
    }

    #[test]
    fn logistic_is_deterministic() {
        let x: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 7) as f64, if i % 3 == 0 { 1.0 } else { 0.0 }])
            .collect();
        let y: Vec<f64> = (0..30).map(|i| ((i * 7) % 5 < 2) as u8 as f64).collect();

        let a = LogisticRegression::fit(&x, &y, LogisticParams::default()).unwrap();
        let b = LogisticRegression::fit(&x, &y, LogisticParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn logistic_rejects_bad_targets() {
        let x = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            LogisticRegression::fit(&x, &[1.0, 1.0], LogisticParams::default()),
            Err(CoreError::InvalidTarget(_))
        ));
        assert!(matches!(
            LogisticRegression::fit(&x, &[0.0, 2.0], LogisticParams::default()),
            Err(CoreError::InvalidTarget(_))
        ));
        let params = LogisticParams {
            c: 0.0,
            ..LogisticParams::default()
        };
        assert!(matches!(
            LogisticRegression::fit(&x, &[0.0, 1.0], params),
            Err(CoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn estimator_checks_dimension() {
        let estimator = Estimator::from(LinearRegression {
            intercept: 1.0,
            weights: vec![1.0, 1.0],
            l2: 0.0,
        });
        assert_eq!(estimator.kind(), EstimatorKind::Linear);
        assert_eq!(estimator.predict(&[1.0, 2.0]).unwrap(), 4.0);
        assert!(matches!(
            estimator.predict(&[1.0]),
            Err(CoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn non_finite_predictions_are_errors() {
        let estimator = Estimator::from(LinearRegression {
            intercept: f64::MAX,
            weights: vec![f64::MAX],
            l2: 0.0,
        });
        assert!(matches!(estimator.predict(&[1.0]), Err(CoreError::NonFinite)));
    }
}
