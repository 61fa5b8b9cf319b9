//! Model training, selection and persistence
//!
//! [`MlBackend`] fits a fixed roster of candidate families on the training
//! partition, scores each on the validation partition, persists every
//! fitted model, and reports the best one. Classification selects the
//! highest accuracy; regression selects the LOWEST root-mean-squared-error.
//! Ties go to the earlier roster entry in both cases.

use crate::data::MlData;
use crate::error::{HeartPredictError, Result};
use crate::training::discriminant::{LinearDiscriminant, QuadraticDiscriminant};
use crate::training::decision_tree::DecisionTree;
use crate::training::knn::KnnClassifier;
use crate::training::logistic::{LogisticRegression, LogisticRegressionCv};
use crate::training::metrics::{accuracy, root_mean_squared_error};
use crate::training::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A persisted training run: where the best model lives and how it scored.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Path of the best-scoring model file
    pub model_file: PathBuf,
    /// Validation score of the best model (accuracy, or RMSE for
    /// regression)
    pub score: f64,
}

/// A fitted classifier of one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedClassifier {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    KNeighbors(KnnClassifier),
    LinearDiscriminant(LinearDiscriminant),
    QuadraticDiscriminant(QuadraticDiscriminant),
}

impl TrainedClassifier {
    /// Family name used in artifact file names.
    pub fn name(&self) -> &'static str {
        match self {
            TrainedClassifier::DecisionTree(_) => "DecisionTreeClassifier",
            TrainedClassifier::RandomForest(_) => "RandomForestClassifier",
            TrainedClassifier::KNeighbors(_) => "KNeighborsClassifier",
            TrainedClassifier::LinearDiscriminant(_) => "LinearDiscriminantAnalysis",
            TrainedClassifier::QuadraticDiscriminant(_) => "QuadraticDiscriminantAnalysis",
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedClassifier::DecisionTree(m) => m.predict(x),
            TrainedClassifier::RandomForest(m) => m.predict(x),
            TrainedClassifier::KNeighbors(m) => m.predict(x),
            TrainedClassifier::LinearDiscriminant(m) => m.predict(x),
            TrainedClassifier::QuadraticDiscriminant(m) => m.predict(x),
        }
    }

    /// Accuracy on a labeled matrix
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        Ok(accuracy(y, &self.predict(x)?))
    }
}

/// A fitted regressor of one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedRegressor {
    LogisticRegression(LogisticRegression),
    LogisticRegressionCv(LogisticRegressionCv),
}

impl TrainedRegressor {
    /// Family name used in artifact file names.
    pub fn name(&self) -> &'static str {
        match self {
            TrainedRegressor::LogisticRegression(_) => "LogisticRegression",
            TrainedRegressor::LogisticRegressionCv(_) => "LogisticRegressionCV",
        }
    }

    /// Predict 0/1 outcomes
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedRegressor::LogisticRegression(m) => m.predict(x),
            TrainedRegressor::LogisticRegressionCv(m) => m.predict(x),
        }
    }

    /// RMSE on a labeled matrix (lower is better)
    pub fn error(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        Ok(root_mean_squared_error(y, &self.predict(x)?))
    }
}

/// Load a persisted classifier; a missing file yields an error carrying
/// the requested path.
pub fn load_classifier(path: &Path) -> Result<TrainedClassifier> {
    read_artifact(path)
}

/// Load a persisted regressor; a missing file yields an error carrying
/// the requested path.
pub fn load_regressor(path: &Path) -> Result<TrainedRegressor> {
    read_artifact(path)
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HeartPredictError::ArtifactNotFound {
                path: path.to_path_buf(),
            }
        } else {
            HeartPredictError::IoError(e)
        }
    })?;
    Ok(serde_json::from_str(&json)?)
}

fn write_artifact<T: Serialize>(artifact: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Trains the candidate rosters against one prepared dataset.
pub struct MlBackend {
    data: Arc<MlData>,
    results_dir: PathBuf,
}

impl MlBackend {
    /// Create a backend writing artifacts under `results_dir`.
    pub fn new(data: Arc<MlData>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            data,
            results_dir: results_dir.into(),
        }
    }

    /// The prepared dataset.
    pub fn data(&self) -> &Arc<MlData> {
        &self.data
    }

    fn model_path(&self, kind: &str, family: &str) -> PathBuf {
        self.results_dir
            .join("trained_models")
            .join(kind)
            .join(format!("{}_model_{}.json", family, self.data.seed()))
    }

    /// Fit every classifier family, persist each, and return the best by
    /// validation accuracy.
    pub fn classification_for_different_classifiers(&self) -> Result<TrainingOutcome> {
        let seed = self.data.seed();
        let train = &self.data.train;
        let valid = &self.data.valid;

        let mut fitted: Vec<TrainedClassifier> = Vec::new();

        let mut tree = DecisionTree::new();
        tree.fit(&train.x, &train.y)?;
        fitted.push(TrainedClassifier::DecisionTree(tree));

        let mut forest = RandomForest::new(100).with_random_state(seed);
        forest.fit(&train.x, &train.y)?;
        fitted.push(TrainedClassifier::RandomForest(forest));

        let mut knn = KnnClassifier::new(5);
        knn.fit(&train.x, &train.y)?;
        fitted.push(TrainedClassifier::KNeighbors(knn));

        let mut lda = LinearDiscriminant::new();
        lda.fit(&train.x, &train.y)?;
        fitted.push(TrainedClassifier::LinearDiscriminant(lda));

        let mut qda = QuadraticDiscriminant::new();
        qda.fit(&train.x, &train.y)?;
        fitted.push(TrainedClassifier::QuadraticDiscriminant(qda));

        let mut best: Option<TrainingOutcome> = None;
        for model in &fitted {
            let score = model.score(&valid.x, &valid.y)?;
            let path = self.model_path("classifier", model.name());
            write_artifact(model, &path)?;
            info!(model = model.name(), accuracy = score, "validation score");

            // Strictly-greater comparison keeps the earlier roster entry on
            // ties.
            match &best {
                Some(b) if score <= b.score => {}
                _ => {
                    best = Some(TrainingOutcome {
                        model_file: path,
                        score,
                    })
                }
            }
        }

        let outcome = best.ok_or_else(|| {
            HeartPredictError::TrainingError("classifier roster is empty".to_string())
        })?;
        info!(
            model_file = %outcome.model_file.display(),
            accuracy = outcome.score,
            "best classifier"
        );
        Ok(outcome)
    }

    /// Fit every regressor family, persist each, and return the best by
    /// validation RMSE. Lower is better, so the comparison direction is
    /// inverted relative to classification.
    pub fn regression_for_different_regressors(&self) -> Result<TrainingOutcome> {
        let seed = self.data.seed();
        let train = &self.data.train;
        let valid = &self.data.valid;

        let mut fitted: Vec<TrainedRegressor> = Vec::new();

        let mut logistic = LogisticRegression::new();
        logistic.fit(&train.x, &train.y)?;
        fitted.push(TrainedRegressor::LogisticRegression(logistic));

        let mut logistic_cv = LogisticRegressionCv::new(5, seed);
        logistic_cv.fit(&train.x, &train.y)?;
        fitted.push(TrainedRegressor::LogisticRegressionCv(logistic_cv));

        let mut best: Option<TrainingOutcome> = None;
        for model in &fitted {
            let error = model.error(&valid.x, &valid.y)?;
            let path = self.model_path("regressor", model.name());
            write_artifact(model, &path)?;
            info!(model = model.name(), rmse = error, "validation error");

            // Strictly-lower comparison keeps the earlier roster entry on
            // ties.
            match &best {
                Some(b) if error >= b.score => {}
                _ => {
                    best = Some(TrainingOutcome {
                        model_file: path,
                        score: error,
                    })
                }
            }
        }

        let outcome = best.ok_or_else(|| {
            HeartPredictError::TrainingError("regressor roster is empty".to_string())
        })?;
        info!(
            model_file = %outcome.model_file.display(),
            rmse = outcome.score,
            "best regressor"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_classifier_carries_path() {
        let err = load_classifier(Path::new("CoolModel.json")).unwrap_err();
        assert!(matches!(err, HeartPredictError::ArtifactNotFound { .. }));
        assert!(err.to_string().contains("CoolModel.json"));
    }

    #[test]
    fn test_load_missing_regressor_carries_path() {
        let err = load_regressor(Path::new("results/nope_model_42.json")).unwrap_err();
        assert!(err.to_string().contains("nope_model_42.json"));
    }
}
