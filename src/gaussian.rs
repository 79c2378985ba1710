use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{PloidyError, Result};
use crate::utils::{LN_2PI, ln_normal_pdf};

/// Multivariate normal density with a full positive-definite covariance.
///
/// The covariance is stored as its lower Cholesky factor so the log-density
/// is exact and needs no matrix inverse.
#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    chol: Array2<f64>,
    ln_norm: f64,
}

impl MultivariateNormal {
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        let dim = mean.len();
        if dim == 0 {
            return Err(PloidyError::invalid_parameter("normal density needs at least one dimension"));
        }
        if covariance.nrows() != dim || covariance.ncols() != dim {
            return Err(PloidyError::invalid_parameter(format!(
                "covariance shape {:?} does not match mean length {dim}",
                covariance.shape()
            )));
        }
        if mean.iter().any(|v| !v.is_finite()) || covariance.iter().any(|v| !v.is_finite()) {
            return Err(PloidyError::invalid_parameter("normal parameters must be finite"));
        }
        for i in 0..dim {
            for j in 0..i {
                if covariance[(i, j)] != covariance[(j, i)] {
                    return Err(PloidyError::invalid_parameter("covariance is not symmetric"));
                }
            }
        }

        let chol = cholesky(&covariance)?;
        let ln_det: f64 = (0..dim).map(|i| 2.0 * chol[(i, i)].ln()).sum();
        let ln_norm = -0.5 * (dim as f64 * LN_2PI + ln_det);
        Ok(Self {
            mean,
            covariance,
            chol,
            ln_norm,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    pub fn ln_pdf(&self, x: ArrayView1<f64>) -> f64 {
        let dim = self.dim();
        if dim == 1 {
            return ln_normal_pdf(x[0], self.mean[0], self.covariance[(0, 0)]);
        }
        // Forward substitution L z = x - mean; the Mahalanobis term is |z|^2.
        let mut z = vec![0.0f64; dim];
        let mut quad = 0.0;
        for i in 0..dim {
            let mut acc = x[i] - self.mean[i];
            for k in 0..i {
                acc -= self.chol[(i, k)] * z[k];
            }
            z[i] = acc / self.chol[(i, i)];
            quad += z[i] * z[i];
        }
        self.ln_norm - 0.5 * quad
    }
}

fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[(j, j)];
        for k in 0..j {
            diag -= l[(j, k)] * l[(j, k)];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(PloidyError::invalid_parameter(format!(
                "covariance is not positive definite (pivot {j} = {diag})"
            )));
        }
        let ljj = diag.sqrt();
        l[(j, j)] = ljj;
        for i in (j + 1)..n {
            let mut v = a[(i, j)];
            for k in 0..j {
                v -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = v / ljj;
        }
    }
    Ok(l)
}
