//! heartpredict - heart-failure survival prediction from clinical records
//!
//! This crate loads a clinical records table, computes descriptive
//! statistics and correlations, trains and selects classification and
//! regression models, and renders Kaplan-Meier survival plots.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`data`] - Dataset loading, feature/label split, seeded
//!   train/validation partitioning
//! - [`preprocessing`] - Feature standardization with persistence
//! - [`training`] - Candidate model families, training engine, best-model
//!   selection
//!
//! ## Analysis views
//! - [`descriptive`] - Per-column summary statistics
//! - [`correlation`] - Pearson and Spearman correlations
//! - [`survival`] - Kaplan-Meier curves stratified by model predictions
//!
//! ## Services
//! - [`cli`] - Command-line interface
//! - [`config`] - Explicit per-run configuration

// Core error handling
pub mod error;

// Core pipeline
pub mod config;
pub mod data;
pub mod preprocessing;
pub mod training;

// Analysis views
pub mod correlation;
pub mod descriptive;
pub mod survival;

// Services
pub mod cli;

pub use error::{HeartPredictError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{HeartPredictError, Result};

    // Configuration
    pub use crate::config::ProjectConfig;

    // Data preparation
    pub use crate::data::{Column, MatrixPair, MlData, ProjectData};

    // Preprocessing
    pub use crate::preprocessing::StandardScaler;

    // Training
    pub use crate::training::{
        load_classifier, load_regressor, MlBackend, TrainedClassifier, TrainedRegressor,
        TrainingOutcome,
    };

    // Analysis views
    pub use crate::correlation::{CorrelationBackend, CorrelationMethod};
    pub use crate::descriptive::{BoolColumn, DescriptiveBackend, DiscreteColumn};
    pub use crate::survival::SurvivalBackend;
}
