//! Integration test: Kaplan-Meier plot rendering end-to-end

mod common;

use heartpredict::prelude::*;
use std::path::Path;

#[test]
fn test_plot_from_freshly_trained_regressor() {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_synthetic_records(dir.path(), 200, 23);
    let config = ProjectConfig::with_csv(&csv).with_results_dir(dir.path().join("results"));

    let project = ProjectData::build(&csv).unwrap();
    let data = MlData::build(project, 0.2, 42, &config).unwrap();

    let backend = MlBackend::new(std::sync::Arc::clone(&data), config.results_dir.clone());
    let outcome = backend.regression_for_different_regressors().unwrap();

    let survival = SurvivalBackend::new(data);
    let plot = survival
        .create_kaplan_meier_plot_for(&outcome.model_file, &config.kaplan_meier_file())
        .unwrap();

    assert_eq!(plot, config.kaplan_meier_file());
    let svg = std::fs::read_to_string(&plot).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Kaplan-Meier"));
    // Both predicted groups appear for a fixture this separable.
    assert!(svg.contains("predicted survival"));
    assert!(svg.contains("predicted death"));
}

#[test]
fn test_plot_with_missing_regressor_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_synthetic_records(dir.path(), 120, 29);
    let config = ProjectConfig::with_csv(&csv).with_results_dir(dir.path().join("results"));

    let project = ProjectData::build(&csv).unwrap();
    let data = MlData::build(project, 0.2, 42, &config).unwrap();

    let survival = SurvivalBackend::new(data);
    let err = survival
        .create_kaplan_meier_plot_for(
            Path::new("results/trained_models/regressor/Gone_model_42.json"),
            &config.kaplan_meier_file(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("Gone_model_42.json"));
    assert!(!config.kaplan_meier_file().exists());
}
