//! Gaussian discriminant analysis classifiers
//!
//! [`LinearDiscriminant`] pools one covariance matrix across classes, giving
//! linear decision boundaries; [`QuadraticDiscriminant`] estimates one
//! covariance per class. Both classify by maximum posterior log-likelihood
//! under a class-conditional Gaussian model.

use crate::error::{HeartPredictError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cholesky decomposition A = L * L^T for a symmetric positive-definite
/// matrix. Returns the lower factor, or None if the matrix is not positive
/// definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }

    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve L * z = b by forward substitution.
fn forward_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut z = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }
    z
}

/// Solve (L * L^T) * x = b given the lower Cholesky factor.
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = forward_solve(l, b);
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Factor a covariance matrix, retrying once with a larger ridge if it is
/// not positive definite.
fn factor_covariance(mut cov: Array2<f64>, reg: f64) -> Result<Array2<f64>> {
    let n = cov.nrows();
    for i in 0..n {
        cov[[i, i]] += reg;
    }
    if let Some(l) = cholesky(&cov) {
        return Ok(l);
    }

    let ridge = 1e-6 * cov.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
    for i in 0..n {
        cov[[i, i]] += ridge;
    }
    cholesky(&cov).ok_or_else(|| {
        HeartPredictError::TrainingError("covariance matrix is not positive definite".to_string())
    })
}

/// Indices of each class, classes in ascending order.
fn partition_by_class(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut partition: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        partition.entry(label.round() as i64).or_default().push(i);
    }
    partition
}

fn class_mean(x: &Array2<f64>, indices: &[usize]) -> Array1<f64> {
    let n_features = x.ncols();
    let mut mean = Array1::zeros(n_features);
    for &i in indices {
        mean = mean + x.row(i);
    }
    mean / indices.len() as f64
}

/// Argmax over per-class scores; the first class wins ties so predictions
/// are deterministic.
fn best_class(classes: &[i64], scores: &[f64]) -> f64 {
    let mut best = 0usize;
    for (k, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = k;
        }
    }
    classes[best] as f64
}

/// Linear discriminant analysis classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearDiscriminant {
    classes: Vec<i64>,
    /// Per-class linear weights `pooled_cov^-1 * mean`
    coefs: Vec<Array1<f64>>,
    /// Per-class intercepts `-mean . w / 2 + ln prior`
    intercepts: Vec<f64>,
    /// Diagonal regularization added to the covariance
    pub reg: f64,
}

impl Default for LinearDiscriminant {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearDiscriminant {
    /// Create an unfitted classifier.
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            coefs: Vec::new(),
            intercepts: Vec::new(),
            reg: 1e-6,
        }
    }

    /// Set the covariance regularization term
    pub fn with_regularization(mut self, reg: f64) -> Self {
        self.reg = reg;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartPredictError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let partition = partition_by_class(y);
        let n_classes = partition.len();
        if n_classes < 2 {
            return Err(HeartPredictError::TrainingError(
                "need at least two classes".to_string(),
            ));
        }
        if n_samples <= n_classes {
            return Err(HeartPredictError::TrainingError(format!(
                "need more samples ({n_samples}) than classes ({n_classes})"
            )));
        }

        // Pooled within-class covariance
        let mut means = Vec::with_capacity(n_classes);
        let mut priors = Vec::with_capacity(n_classes);
        let mut pooled: Array2<f64> = Array2::zeros((n_features, n_features));

        for indices in partition.values() {
            let mean = class_mean(x, indices);
            for &i in indices {
                let centered = &x.row(i).to_owned() - &mean;
                for a in 0..n_features {
                    for b in 0..n_features {
                        pooled[[a, b]] += centered[a] * centered[b];
                    }
                }
            }
            priors.push(indices.len() as f64 / n_samples as f64);
            means.push(mean);
        }
        pooled /= (n_samples - n_classes) as f64;

        let l = factor_covariance(pooled, self.reg)?;

        self.classes = partition.keys().copied().collect();
        self.coefs.clear();
        self.intercepts.clear();
        for (mean, prior) in means.iter().zip(priors.iter()) {
            let w = cholesky_solve(&l, mean);
            let b = -0.5 * mean.dot(&w) + prior.ln();
            self.coefs.push(w);
            self.intercepts.push(b);
        }

        Ok(self)
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(HeartPredictError::ModelNotFitted);
        }

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let scores: Vec<f64> = self
                    .coefs
                    .iter()
                    .zip(self.intercepts.iter())
                    .map(|(w, b)| row.dot(w) + b)
                    .collect();
                best_class(&self.classes, &scores)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Quadratic discriminant analysis classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraticDiscriminant {
    classes: Vec<i64>,
    priors: Vec<f64>,
    means: Vec<Array1<f64>>,
    /// Per-class lower Cholesky factor of the covariance
    factors: Vec<Array2<f64>>,
    /// Per-class log-determinant of the covariance
    log_dets: Vec<f64>,
    /// Diagonal regularization added to each covariance
    pub reg: f64,
}

impl Default for QuadraticDiscriminant {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadraticDiscriminant {
    /// Create an unfitted classifier.
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            priors: Vec::new(),
            means: Vec::new(),
            factors: Vec::new(),
            log_dets: Vec::new(),
            reg: 1e-6,
        }
    }

    /// Set the covariance regularization term
    pub fn with_regularization(mut self, reg: f64) -> Self {
        self.reg = reg;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartPredictError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let partition = partition_by_class(y);
        if partition.len() < 2 {
            return Err(HeartPredictError::TrainingError(
                "need at least two classes".to_string(),
            ));
        }

        self.classes = partition.keys().copied().collect();
        self.priors.clear();
        self.means.clear();
        self.factors.clear();
        self.log_dets.clear();

        for (&class, indices) in &partition {
            let n_class = indices.len();
            if n_class < 2 {
                return Err(HeartPredictError::TrainingError(format!(
                    "class {class} has fewer than 2 samples"
                )));
            }

            let mean = class_mean(x, indices);
            let mut cov: Array2<f64> = Array2::zeros((n_features, n_features));
            for &i in indices {
                let centered = &x.row(i).to_owned() - &mean;
                for a in 0..n_features {
                    for b in 0..n_features {
                        cov[[a, b]] += centered[a] * centered[b];
                    }
                }
            }
            cov /= (n_class - 1) as f64;

            let l = factor_covariance(cov, self.reg)?;
            let log_det = 2.0 * l.diag().iter().map(|v| v.ln()).sum::<f64>();

            self.priors.push(n_class as f64 / n_samples as f64);
            self.means.push(mean);
            self.factors.push(l);
            self.log_dets.push(log_det);
        }

        Ok(self)
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(HeartPredictError::ModelNotFitted);
        }

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let scores: Vec<f64> = (0..self.classes.len())
                    .map(|k| {
                        let centered = &row.to_owned() - &self.means[k];
                        // ||L^-1 (x - mean)||^2 = (x - mean)^T cov^-1 (x - mean)
                        let z = forward_solve(&self.factors[k], &centered);
                        let quad = z.iter().map(|v| v * v).sum::<f64>();
                        self.priors[k].ln() - 0.5 * self.log_dets[k] - 0.5 * quad
                    })
                    .collect();
                best_class(&self.classes, &scores)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}
