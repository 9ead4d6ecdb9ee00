//! Small dense linear algebra used by the estimators
//!
//! Matrices are row-major `Vec<Vec<f64>>`; sizes are bounded by the number of
//! encoded features, so a direct solver is sufficient.

use crate::errors::{CoreError, Result};

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: f64 = 1e-14;

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// `a` must be square with the same size as `b`; both are consumed.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n {
        return Err(CoreError::DimensionMismatch {
            expected: n,
            actual: a.len(),
        });
    }
    if let Some(row) = a.iter().find(|row| row.len() != n) {
        return Err(CoreError::DimensionMismatch {
            expected: n,
            actual: row.len(),
        });
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        let scale = a.iter().map(|row| row[col].abs()).fold(1.0_f64, f64::max);
        if a[pivot][col].abs() <= PIVOT_EPSILON * scale {
            return Err(CoreError::SingularMatrix(col));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::NonFinite);
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        // 2x + y = 5, x + 3y = 10  =>  x = 1, y = 3
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![5.0, 10.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pivots_on_zero_leading_entry() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve(a, vec![2.0, 3.0]).unwrap();
        assert_eq!(x, vec![3.0, 2.0]);
    }

    #[test]
    fn singular_system_is_reported() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(solve(a, vec![1.0, 2.0]), Err(CoreError::SingularMatrix(1))));
    }

    #[test]
    fn shape_is_checked() {
        let a = vec![vec![1.0, 2.0]];
        assert!(matches!(
            solve(a, vec![1.0, 2.0]),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }
}
