//! Model training module
//!
//! Provides the candidate estimator families and the training engine that
//! fits, scores, selects and persists them:
//! - Decision tree and random forest
//! - K-nearest neighbors
//! - Linear and quadratic discriminant analysis
//! - Logistic regression, plain and cross-validated

pub mod cross_validation;
pub mod decision_tree;
pub mod discriminant;
mod engine;
pub mod knn;
pub mod logistic;
pub mod metrics;
pub mod random_forest;

pub use cross_validation::{CvSplit, KFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use discriminant::{LinearDiscriminant, QuadraticDiscriminant};
pub use engine::{
    load_classifier, load_regressor, MlBackend, TrainedClassifier, TrainedRegressor,
    TrainingOutcome,
};
pub use knn::KnnClassifier;
pub use logistic::{LogisticRegression, LogisticRegressionCv};
pub use metrics::{accuracy, root_mean_squared_error};
pub use random_forest::RandomForest;
