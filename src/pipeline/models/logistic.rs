//! L2-regularised logistic regression fitted by Newton's method (IRLS)

use anyhow::Result;
use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{require_both_classes, sigmoid, Classifier};

/// Logistic regression settings and fitted weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength (penalty is `||w||^2 / (2C)`)
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Fitted coefficients, one per input column
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Newton iterations actually run
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            max_iter: 100,
            tol: 1e-8,
            coefficients: Vec::new(),
            intercept: 0.0,
            n_iter: 0,
        }
    }

    fn linear(&self, x: &Array2<f64>) -> Array1<f64> {
        let w = Array1::from_vec(self.coefficients.clone());
        x.dot(&w) + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        require_both_classes(x, y)?;
        if self.c.is_nan() || self.c <= 0.0 {
            anyhow::bail!("Regularisation parameter C must be positive, got {}", self.c);
        }

        let (n, p) = x.dim();
        let penalty = 1.0 / self.c;

        // Design matrix with a trailing intercept column of ones
        let mut design = Array2::<f64>::ones((n, p + 1));
        design.slice_mut(s![.., ..p]).assign(x);
        let targets: Array1<f64> = y.iter().map(|&v| f64::from(v)).collect();

        // Intercept is unpenalised; its tiny ridge only keeps the pivot positive
        let mut ridge = Array1::from_elem(p + 1, penalty);
        ridge[p] = 1e-10;

        let mut beta = Array1::<f64>::zeros(p + 1);
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;

            let prob = design.dot(&beta).mapv(sigmoid);
            let residual = &prob - &targets;
            let weights = prob.mapv(|q| (q * (1.0 - q)).max(1e-12));

            let mut shrink = &beta * penalty;
            shrink[p] = 0.0;
            let grad = design.t().dot(&residual) + shrink;

            let weighted = &design * &weights.view().insert_axis(Axis(1));
            let mut hess = design.t().dot(&weighted);
            hess.diag_mut().zip_mut_with(&ridge, |h, &r| *h += r);

            let step = cholesky_solve(&hess, &grad)
                .ok_or_else(|| anyhow::anyhow!("Logistic regression Hessian is not positive definite"))?;
            beta -= &step;

            if beta.iter().any(|b| !b.is_finite()) {
                anyhow::bail!("Logistic regression diverged");
            }
            let max_step = step.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if max_step < self.tol {
                break;
            }
        }

        self.intercept = beta[p];
        self.coefficients = beta.slice(s![..p]).to_vec();
        self.n_iter = iterations;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            anyhow::bail!(
                "Logistic regression expects {} features, got {}",
                self.coefficients.len(),
                x.ncols()
            );
        }
        Ok(self.linear(x).mapv(sigmoid))
    }
}

/// Solve the symmetric positive-definite system `a * x = b` by Cholesky
/// decomposition. Returns `None` when `a` is not positive definite.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum = l.row(i).slice(s![..j]).dot(&l.row(j).slice(s![..j]));
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum = l.row(i).slice(s![..i]).dot(&y.slice(s![..i]));
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum = l.column(i).slice(s![i + 1..]).dot(&x.slice(s![i + 1..]));
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}
