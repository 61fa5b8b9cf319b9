//! Project configuration
//!
//! Every command receives an explicit [`ProjectConfig`] instead of reading
//! process-wide state, so the CSV location and output layout are fixed at
//! the call site.

use std::path::{Path, PathBuf};

/// Default location of the clinical records CSV, relative to the working
/// directory.
pub const DEFAULT_CSV: &str = "data/heart_failure_clinical_records.csv";

/// Default root directory for persisted artifacts.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Locations used by a single pipeline run.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Source CSV with one row per subject.
    pub csv: PathBuf,
    /// Root directory for persisted scalers, models and plots.
    pub results_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from(DEFAULT_CSV),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl ProjectConfig {
    /// Config reading from `csv` and writing under the default results root.
    pub fn with_csv(csv: impl Into<PathBuf>) -> Self {
        Self {
            csv: csv.into(),
            ..Default::default()
        }
    }

    /// Directory holding fitted scalers.
    pub fn scaler_dir(&self) -> PathBuf {
        self.results_dir.join("scalers")
    }

    /// Fixed path of the most recently fitted scaler (last write wins).
    pub fn scaler_file(&self) -> PathBuf {
        self.scaler_dir().join("used_scaler.json")
    }

    /// Directory holding trained models for one task kind
    /// (`"classifier"` or `"regressor"`).
    pub fn model_dir(&self, kind: &str) -> PathBuf {
        self.results_dir.join("trained_models").join(kind)
    }

    /// Path of the rendered Kaplan-Meier plot.
    pub fn kaplan_meier_file(&self) -> PathBuf {
        self.results_dir.join("kaplan_meier_plot.svg")
    }

    /// Change the results root, keeping the CSV location.
    pub fn with_results_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.results_dir = dir.as_ref().to_path_buf();
        self
    }
}
