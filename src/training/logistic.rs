//! Logistic regression models
//!
//! The tool's regression roster scores these by RMSE over their 0/1
//! predictions on the validation partition.

use crate::error::{HeartPredictError, Result};
use crate::training::cross_validation::KFold;
use crate::training::metrics::accuracy;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression fit by gradient descent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create an unfitted model.
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit the model using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartPredictError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = self.alpha;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);

        Ok(self)
    }

    /// Predict event probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(HeartPredictError::ModelNotFitted)?;
        let intercept = self.intercept.unwrap_or(0.0);

        let linear = x.dot(coefficients) + intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// Predict 0/1 class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Logistic regression with its L2 strength chosen by K-fold
/// cross-validation over a fixed grid, then refit on the full data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionCv {
    /// Candidate regularization strengths, tried in order
    pub alphas: Vec<f64>,
    /// Number of CV folds
    pub cv_folds: usize,
    /// Seed for the fold shuffle
    pub random_state: u64,
    /// Strength chosen by cross-validation
    pub best_alpha: Option<f64>,
    model: Option<LogisticRegression>,
}

impl LogisticRegressionCv {
    /// Create an unfitted model with the default strength grid.
    pub fn new(cv_folds: usize, random_state: u64) -> Self {
        Self {
            alphas: vec![1e-4, 1e-3, 1e-2, 1e-1, 1.0],
            cv_folds,
            random_state,
            best_alpha: None,
            model: None,
        }
    }

    /// Replace the strength grid
    pub fn with_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.alphas = alphas;
        self
    }

    /// Fit: pick the strength with the best mean CV accuracy (first in the
    /// grid wins ties), then refit on all rows.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.alphas.is_empty() {
            return Err(HeartPredictError::ValidationError(
                "strength grid is empty".to_string(),
            ));
        }

        let splits = KFold::new(self.cv_folds, self.random_state).split(x.nrows())?;

        let mut best: Option<(f64, f64)> = None;
        for &alpha in &self.alphas {
            let mut fold_scores = Vec::with_capacity(splits.len());
            for split in &splits {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train: Array1<f64> =
                    split.train_indices.iter().map(|&i| y[i]).collect();
                let x_test = x.select(Axis(0), &split.test_indices);
                let y_test: Array1<f64> = split.test_indices.iter().map(|&i| y[i]).collect();

                let mut model = LogisticRegression::new().with_alpha(alpha);
                model.fit(&x_train, &y_train)?;
                fold_scores.push(accuracy(&y_test, &model.predict(&x_test)?));
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            tracing::debug!(alpha, mean_score, "cross-validated strength");

            match best {
                Some((_, s)) if mean_score <= s => {}
                _ => best = Some((alpha, mean_score)),
            }
        }

        let (alpha, _) = best.ok_or_else(|| {
            HeartPredictError::TrainingError("no strength candidate was scored".to_string())
        })?;
        let mut model = LogisticRegression::new().with_alpha(alpha);
        model.fit(x, y)?;

        self.best_alpha = Some(alpha);
        self.model = Some(model);
        Ok(self)
    }

    /// Predict event probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model
            .as_ref()
            .ok_or(HeartPredictError::ModelNotFitted)?
            .predict_proba(x)
    }

    /// Predict 0/1 class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model
            .as_ref()
            .ok_or(HeartPredictError::ModelNotFitted)?
            .predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            rows.push([-2.0 - 0.1 * i as f64, -1.5 - 0.2 * i as f64]);
            labels.push(0.0);
            rows.push([2.0 + 0.1 * i as f64, 1.5 + 0.2 * i as f64]);
            labels.push(1.0);
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        (
            Array2::from_shape_vec((20, 2), flat).unwrap(),
            Array1::from_vec(labels),
        )
    }

    #[test]
    fn test_fit_predict_separable() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_probabilities_bounded() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0, 2.0]]),
            Err(HeartPredictError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_cv_selects_and_records_alpha() {
        let (x, y) = separable_data();
        let mut model = LogisticRegressionCv::new(4, 42);
        model.fit(&x, &y).unwrap();

        let alpha = model.best_alpha.unwrap();
        assert!(model.alphas.contains(&alpha));
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_cv_is_deterministic() {
        let (x, y) = separable_data();
        let mut a = LogisticRegressionCv::new(4, 42);
        a.fit(&x, &y).unwrap();
        let mut b = LogisticRegressionCv::new(4, 42);
        b.fit(&x, &y).unwrap();
        assert_eq!(a.best_alpha, b.best_alpha);
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
