//! Integration test: model training, selection and persistence

mod common;

use heartpredict::prelude::*;
use heartpredict::training::{accuracy, root_mean_squared_error};
use std::path::Path;

fn trained_backend(rows: usize, seed: u64) -> (tempfile::TempDir, ProjectConfig, MlBackend) {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_synthetic_records(dir.path(), rows, 11);
    let config = ProjectConfig::with_csv(csv).with_results_dir(dir.path().join("results"));

    let project = ProjectData::build(&config.csv).unwrap();
    let data = MlData::build(project, 0.2, seed, &config).unwrap();
    let backend = MlBackend::new(data, config.results_dir.clone());
    (dir, config, backend)
}

#[test]
fn test_classification_persists_every_family() {
    let (_dir, config, backend) = trained_backend(200, 42);
    let outcome = backend.classification_for_different_classifiers().unwrap();

    let model_dir = config.model_dir("classifier");
    for family in [
        "DecisionTreeClassifier",
        "RandomForestClassifier",
        "KNeighborsClassifier",
        "LinearDiscriminantAnalysis",
        "QuadraticDiscriminantAnalysis",
    ] {
        let path = model_dir.join(format!("{family}_model_42.json"));
        assert!(path.exists(), "missing artifact for {family}");
    }
    assert!(outcome.model_file.exists());
    assert!(outcome.score > 0.7, "accuracy too low: {}", outcome.score);
}

#[test]
fn test_best_classifier_round_trips() {
    let (_dir, _config, backend) = trained_backend(200, 42);
    let outcome = backend.classification_for_different_classifiers().unwrap();

    let model = load_classifier(&outcome.model_file).unwrap();
    let valid = &backend.data().valid;
    let score = model.score(&valid.x, &valid.y).unwrap();
    assert_eq!(score, outcome.score);
}

#[test]
fn test_classifier_selection_is_deterministic() {
    let (_dir, _config, backend) = trained_backend(180, 7);

    let first = backend.classification_for_different_classifiers().unwrap();
    let second = backend.classification_for_different_classifiers().unwrap();
    assert_eq!(first.model_file, second.model_file);
    assert_eq!(first.score, second.score);
}

#[test]
fn test_best_classifier_beats_or_matches_all_candidates() {
    let (_dir, config, backend) = trained_backend(200, 42);
    let outcome = backend.classification_for_different_classifiers().unwrap();

    let valid = &backend.data().valid;
    for family in [
        "DecisionTreeClassifier",
        "RandomForestClassifier",
        "KNeighborsClassifier",
        "LinearDiscriminantAnalysis",
        "QuadraticDiscriminantAnalysis",
    ] {
        let path = config
            .model_dir("classifier")
            .join(format!("{family}_model_42.json"));
        let model = load_classifier(&path).unwrap();
        let score = accuracy(&valid.y, &model.predict(&valid.x).unwrap());
        assert!(
            outcome.score >= score,
            "{family} scored {score}, best reported {}",
            outcome.score
        );
    }
}

#[test]
fn test_regression_selects_lowest_error() {
    let (_dir, config, backend) = trained_backend(200, 42);
    let outcome = backend.regression_for_different_regressors().unwrap();

    let valid = &backend.data().valid;
    let mut errors = Vec::new();
    for family in ["LogisticRegression", "LogisticRegressionCV"] {
        let path = config
            .model_dir("regressor")
            .join(format!("{family}_model_42.json"));
        let model = load_regressor(&path).unwrap();
        let error = root_mean_squared_error(&valid.y, &model.predict(&valid.x).unwrap());
        errors.push(error);
        assert!(
            outcome.score <= error,
            "{family} error {error} beats reported best {}",
            outcome.score
        );
    }
    let min = errors.iter().cloned().fold(f64::INFINITY, f64::min);
    assert_eq!(outcome.score, min);
}

#[test]
fn test_regressor_round_trips() {
    let (_dir, _config, backend) = trained_backend(160, 5);
    let outcome = backend.regression_for_different_regressors().unwrap();

    let model = load_regressor(&outcome.model_file).unwrap();
    let valid = &backend.data().valid;
    let error = model.error(&valid.x, &valid.y).unwrap();
    assert_eq!(error, outcome.score);
}

#[test]
fn test_new_seed_accumulates_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_synthetic_records(dir.path(), 160, 13);
    let config = ProjectConfig::with_csv(&csv).with_results_dir(dir.path().join("results"));
    let project = ProjectData::build(&csv).unwrap();

    for seed in [1, 2] {
        let data = MlData::build(std::sync::Arc::clone(&project), 0.2, seed, &config).unwrap();
        MlBackend::new(data, config.results_dir.clone())
            .regression_for_different_regressors()
            .unwrap();
    }

    let model_dir = config.model_dir("regressor");
    assert!(model_dir.join("LogisticRegression_model_1.json").exists());
    assert!(model_dir.join("LogisticRegression_model_2.json").exists());
}

/// Two clusters far enough apart that every candidate scores perfectly,
/// forcing a tie.
fn write_trivial_records(dir: &Path) -> std::path::PathBuf {
    use std::io::Write;
    let path = dir.join("trivial.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", common::HEADER).unwrap();
    for i in 0..120 {
        let death = i % 2 == 0;
        let (age, ejection, creatinine, time) = if death {
            (90.0 + (i % 5) as f64, 10.0, 9.0, 10.0 + (i % 7) as f64)
        } else {
            (30.0 + (i % 5) as f64, 70.0, 0.5, 260.0 + (i % 7) as f64)
        };
        writeln!(
            file,
            "{age},0,100,0,{ejection},0,260000,{creatinine},137,1,0,{time},{}",
            u8::from(death)
        )
        .unwrap();
    }
    path
}

#[test]
fn test_tied_scores_prefer_roster_order() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_trivial_records(dir.path());
    let config = ProjectConfig::with_csv(&csv).with_results_dir(dir.path().join("results"));

    let project = ProjectData::build(&csv).unwrap();
    let data = MlData::build(project, 0.2, 42, &config).unwrap();
    let backend = MlBackend::new(data, config.results_dir.clone());

    let classification = backend.classification_for_different_classifiers().unwrap();
    assert_eq!(classification.score, 1.0);
    assert!(classification
        .model_file
        .ends_with("DecisionTreeClassifier_model_42.json"));

    let regression = backend.regression_for_different_regressors().unwrap();
    assert_eq!(regression.score, 0.0);
    assert!(regression
        .model_file
        .ends_with("LogisticRegression_model_42.json"));
}

#[test]
fn test_loading_missing_model_reports_path() {
    let err = load_classifier(Path::new("results/CoolModel.json")).unwrap_err();
    assert!(err.to_string().contains("results/CoolModel.json"));

    let err = load_regressor(Path::new("results/CoolModel.json")).unwrap_err();
    assert!(err.to_string().contains("results/CoolModel.json"));
}
