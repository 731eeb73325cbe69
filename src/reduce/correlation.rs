//! Pearson correlation over the columns of a feature matrix.

use ndarray::{Array2, Axis};

/// k x k correlation matrix for an n x k matrix, computed in one pass over the
/// centered data. Entries involving a zero-variance column, or any entry when
/// there are fewer than two rows, are NaN.
pub fn correlation_matrix(values: &Array2<f64>) -> Array2<f64> {
    let (n, k) = values.dim();
    let mut corr = Array2::from_elem((k, k), f64::NAN);
    if n < 2 {
        return corr;
    }
    let Some(mean) = values.mean_axis(Axis(0)) else {
        return corr;
    };
    let centered = values - &mean;
    let cov = centered.t().dot(&centered) / (n - 1) as f64;
    let std = cov.diag().mapv(f64::sqrt);

    for i in 0..k {
        for j in 0..k {
            if std[i] > 0.0 && std[j] > 0.0 {
                corr[[i, j]] = (cov[[i, j]] / (std[i] * std[j])).clamp(-1.0, 1.0);
            }
        }
    }
    corr
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_and_inverse_correlation() {
        let m = array![[1.0, 2.0, 5.0], [2.0, 4.0, 4.0], [3.0, 6.0, 3.0]];
        let c = correlation_matrix(&m);
        assert!((c[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((c[[0, 2]] + 1.0).abs() < 1e-12);
        assert!((c[[1, 1]] - 1.0).abs() < 1e-12);
        assert_eq!(c[[1, 0]], c[[0, 1]]);
    }

    #[test]
    fn orthogonal_columns_are_uncorrelated() {
        let m = array![[1.0, 1.0], [-1.0, 1.0], [1.0, -1.0], [-1.0, -1.0]];
        let c = correlation_matrix(&m);
        assert!(c[[0, 1]].abs() < 1e-12);
    }

    #[test]
    fn constant_column_is_nan() {
        let m = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let c = correlation_matrix(&m);
        assert!(c[[0, 1]].is_nan());
        assert!(c[[1, 1]].is_nan());
        assert!((c[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_row_is_all_nan() {
        let m = array![[1.0, 2.0]];
        assert!(correlation_matrix(&m).iter().all(|v| v.is_nan()));
    }
}
