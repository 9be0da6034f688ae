use crate::{FundamentalsError, FundamentalsResult};

/// Relative size below which a pivot counts as zero
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Lower-triangular Cholesky factor `L` with `L·Lᵀ = matrix`.
///
/// Positive semi-definite input is accepted: a pivot that vanishes (within a
/// tolerance relative to its own diagonal entry) yields a zero column, as for
/// perfectly correlated markets. A negative pivot is an error. Tolerances
/// scale with the diagonal, so tiny variances are factored like large ones.
pub fn cholesky(matrix: &[Vec<f64>]) -> FundamentalsResult<Vec<Vec<f64>>> {
    let n = matrix.len();
    let tolerance: Vec<f64> = (0..n).map(|i| PIVOT_TOLERANCE * matrix[i][i].abs()).collect();

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum < -tolerance[i] {
                    return Err(FundamentalsError::NotPositiveSemiDefinite);
                }
                l[i][j] = if sum <= tolerance[i] { 0.0 } else { sum.sqrt() };
            } else if l[j][j] == 0.0 {
                // A zero pivot leaves no room for residual covariance
                if sum.abs() > (tolerance[i] * tolerance[j]).sqrt() {
                    return Err(FundamentalsError::NotPositiveSemiDefinite);
                }
                l[i][j] = 0.0;
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Ok(l)
}
