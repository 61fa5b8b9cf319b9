//! K-nearest-neighbors classifier

use crate::error::{HeartPredictError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// KNN classifier with Euclidean distance and uniform-weight majority
/// voting. Fitting stores the training data; all work happens at predict
/// time, parallelized over query rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    /// Number of neighbors
    pub n_neighbors: usize,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnClassifier {
    /// Create an unfitted classifier with `n_neighbors` neighbors.
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            x_train: None,
            y_train: None,
        }
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(HeartPredictError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() < self.n_neighbors {
            return Err(HeartPredictError::ValidationError(format!(
                "need at least {} samples for {} neighbors, got {}",
                self.n_neighbors,
                self.n_neighbors,
                x.nrows()
            )));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(self)
    }

    /// Predict class labels by majority vote among the k nearest training
    /// rows; lower class wins ties.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(HeartPredictError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(HeartPredictError::ModelNotFitted)?;
        let k = self.n_neighbors;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);

                let mut distances: Vec<(f64, f64)> = x_train
                    .rows()
                    .into_iter()
                    .zip(y_train.iter())
                    .map(|(train_row, &label)| {
                        let dist = row
                            .iter()
                            .zip(train_row.iter())
                            .map(|(a, b)| (a - b).powi(2))
                            .sum::<f64>();
                        (dist, label)
                    })
                    .collect();

                // Stable sort keeps earlier training rows ahead on distance
                // ties, so predictions are deterministic.
                distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut votes: HashMap<i64, usize> = HashMap::new();
                for &(_, label) in distances.iter().take(k) {
                    *votes.entry(label.round() as i64).or_insert(0) += 1;
                }
                let mut entries: Vec<(i64, usize)> = votes.into_iter().collect();
                entries.sort_unstable_by_key(|&(class, _)| class);
                entries
                    .into_iter()
                    .fold(None, |best: Option<(i64, usize)>, (class, count)| match best {
                        Some((_, c)) if count <= c => best,
                        _ => Some((class, count)),
                    })
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}
