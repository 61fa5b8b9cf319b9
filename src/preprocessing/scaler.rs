//! Feature standardization

use crate::error::{HeartPredictError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Z-score standardizer: per-column mean and standard deviation learned
/// from a reference matrix, applied to any matrix with the same width.
///
/// Columns with zero variance keep scale 1.0, so transforming only centers
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Create an unfitted scaler.
    pub fn new() -> Self {
        Self {
            means: Vec::new(),
            scales: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn per-column mean and standard deviation from `x`.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(HeartPredictError::ValidationError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n = x.nrows() as f64;
        self.means.clear();
        self.scales.clear();

        for col in x.axis_iter(Axis(1)) {
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            self.means.push(mean);
            self.scales.push(if std == 0.0 { 1.0 } else { std });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Standardize `x` using the learned statistics, without refitting.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(HeartPredictError::ModelNotFitted);
        }
        if x.ncols() != self.means.len() {
            return Err(HeartPredictError::ShapeError {
                expected: format!("{} columns", self.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[j];
            let scale = self.scales[j];
            col.mapv_inplace(|v| (v - mean) / scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Persist the fitted scaler as JSON, overwriting any prior file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.is_fitted {
            return Err(HeartPredictError::ModelNotFitted);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously persisted scaler.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HeartPredictError::ArtifactNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                HeartPredictError::IoError(e)
            }
        })?;
        let scaler: Self = serde_json::from_str(&json)?;
        Ok(scaler)
    }

    /// Learned per-column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Learned per-column scales.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for j in 0..2 {
            let col = scaled.column(j);
            let mean = col.sum() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_column_is_only_centered() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for i in 0..3 {
            assert_relative_eq!(scaled[[i, 0]], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transform_new_data_uses_learned_stats() {
        let train = array![[0.0], [2.0], [4.0]];
        let other = array![[6.0]];

        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        let scaled = scaler.transform(&other).unwrap();

        // (6 - 2) / std([0, 2, 4])
        let std = (8.0f64 / 3.0).sqrt();
        assert_relative_eq!(scaled[[0, 0]], 4.0 / std, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let scaler = StandardScaler::new();
        let x = array![[1.0]];
        assert!(matches!(
            scaler.transform(&x),
            Err(HeartPredictError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_transform_rejects_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalers/used_scaler.json");

        let x = array![[1.0, -3.0], [2.0, 0.0], [6.0, 3.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        scaler.save(&path).unwrap();

        let reloaded = StandardScaler::load(&path).unwrap();
        let a = scaler.transform(&x).unwrap();
        let b = reloaded.transform(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_missing_file_carries_path() {
        let err = StandardScaler::load(Path::new("nowhere/used_scaler.json")).unwrap_err();
        assert!(matches!(err, HeartPredictError::ArtifactNotFound { .. }));
        assert!(err.to_string().contains("used_scaler.json"));
    }
}
