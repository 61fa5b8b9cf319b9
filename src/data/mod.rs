//! Dataset loading and train/validation preparation
//!
//! [`ProjectData`] owns the loaded clinical records table and is cached per
//! CSV path for the lifetime of the process. [`MlData`] derives the numeric
//! feature/label matrices from it: the whole dataset, a scaled copy of the
//! whole feature matrix, and a seeded train/validation split with
//! fit-on-train scaling. `MlData` is cached by its full argument tuple, so
//! repeated builds with identical arguments return the identical object.

use crate::config::ProjectConfig;
use crate::error::{HeartPredictError, Result};
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Closed set of columns in the clinical records table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Column {
    Age,
    Anaemia,
    CreatininePhosphokinase,
    Diabetes,
    EjectionFraction,
    HighBloodPressure,
    Platelets,
    SerumCreatinine,
    SerumSodium,
    Sex,
    Smoking,
    Time,
    DeathEvent,
}

impl Column {
    /// All columns, label last.
    pub const ALL: [Column; 13] = [
        Column::Age,
        Column::Anaemia,
        Column::CreatininePhosphokinase,
        Column::Diabetes,
        Column::EjectionFraction,
        Column::HighBloodPressure,
        Column::Platelets,
        Column::SerumCreatinine,
        Column::SerumSodium,
        Column::Sex,
        Column::Smoking,
        Column::Time,
        Column::DeathEvent,
    ];

    /// The twelve feature columns, in table order.
    pub const FEATURES: [Column; 12] = [
        Column::Age,
        Column::Anaemia,
        Column::CreatininePhosphokinase,
        Column::Diabetes,
        Column::EjectionFraction,
        Column::HighBloodPressure,
        Column::Platelets,
        Column::SerumCreatinine,
        Column::SerumSodium,
        Column::Sex,
        Column::Smoking,
        Column::Time,
    ];

    /// Header name as it appears in the CSV.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Age => "age",
            Column::Anaemia => "anaemia",
            Column::CreatininePhosphokinase => "creatinine_phosphokinase",
            Column::Diabetes => "diabetes",
            Column::EjectionFraction => "ejection_fraction",
            Column::HighBloodPressure => "high_blood_pressure",
            Column::Platelets => "platelets",
            Column::SerumCreatinine => "serum_creatinine",
            Column::SerumSodium => "serum_sodium",
            Column::Sex => "sex",
            Column::Smoking => "smoking",
            Column::Time => "time",
            Column::DeathEvent => "DEATH_EVENT",
        }
    }
}

/// A feature matrix with its parallel label vector.
#[derive(Debug, Clone)]
pub struct MatrixPair {
    /// One row per subject, one column per feature.
    pub x: Array2<f64>,
    /// Label per subject, same row order as `x`.
    pub y: Array1<f64>,
}

/// The loaded clinical records table, immutable after construction.
#[derive(Debug)]
pub struct ProjectData {
    path: PathBuf,
    df: DataFrame,
}

static PROJECT_CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<ProjectData>>>> = OnceLock::new();

impl ProjectData {
    /// Load the table at `csv`, or return the cached copy for that path.
    ///
    /// Fails fast if the file does not exist or any expected column is
    /// missing.
    pub fn build(csv: &Path) -> Result<Arc<Self>> {
        if !csv.exists() {
            return Err(HeartPredictError::DatasetNotFound {
                path: csv.to_path_buf(),
            });
        }
        let key = csv.canonicalize()?;

        let cache = PROJECT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        let mut cache = cache.lock().expect("project cache poisoned");
        if let Some(data) = cache.get(&key) {
            return Ok(Arc::clone(data));
        }

        let df = read_csv(csv)?;
        validate_schema(&df)?;
        tracing::debug!(path = %csv.display(), rows = df.height(), "loaded dataset");

        let data = Arc::new(Self { path: key.clone(), df });
        cache.insert(key, Arc::clone(&data));
        Ok(data)
    }

    /// Canonical path of the source CSV.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full table.
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    /// Split the table into the raw feature matrix and label vector,
    /// preserving row order.
    pub fn feature_label_split(&self) -> Result<MatrixPair> {
        let x = columns_to_array2(&self.df, &Column::FEATURES)?;
        let y = column_to_array1(&self.df, Column::DeathEvent)?;
        Ok(MatrixPair { x, y })
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn validate_schema(df: &DataFrame) -> Result<()> {
    let missing: Vec<String> = Column::ALL
        .iter()
        .filter(|c| df.column(c.as_str()).is_err())
        .map(|c| c.as_str().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HeartPredictError::MalformedDataset { missing });
    }
    Ok(())
}

/// Extract named columns into a row-major `Array2<f64>`.
fn columns_to_array2(df: &DataFrame, columns: &[Column]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = columns.len();

    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|col| {
            let series = df
                .column(col.as_str())
                .map_err(|_| HeartPredictError::ColumnNotFound(col.as_str().to_string()))?;
            let series_f64 = series
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|e| HeartPredictError::DataError(e.to_string()))?;
            let values: Vec<f64> = series_f64
                .f64()
                .map_err(|e| HeartPredictError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract one named column as an `Array1<f64>`.
pub(crate) fn column_to_array1(df: &DataFrame, column: Column) -> Result<Array1<f64>> {
    let series = df
        .column(column.as_str())
        .map_err(|_| HeartPredictError::ColumnNotFound(column.as_str().to_string()))?;
    let series_f64 = series
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| HeartPredictError::DataError(e.to_string()))?;
    let values: Vec<f64> = series_f64
        .f64()
        .map_err(|e| HeartPredictError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    Ok(Array1::from_vec(values))
}

/// Seeded shuffle split: validation indices first, training indices second.
/// The validation size is `ceil(n * fraction)`.
fn seeded_split(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_valid = (n as f64 * fraction).ceil() as usize;
    let valid = indices[..n_valid].to_vec();
    let train = indices[n_valid..].to_vec();
    (valid, train)
}

/// Prepared matrices for model training.
///
/// `scaled_x` runs the whole feature matrix through a scaler fit on the
/// whole dataset; `train`/`valid` use a second scaler fit on the training
/// partition only. The two scaler instances are deliberately distinct, and
/// each fit overwrites the single on-disk scaler file.
#[derive(Debug)]
pub struct MlData {
    project: Arc<ProjectData>,
    validation_split: f64,
    seed: u64,
    /// Whole dataset, unscaled.
    pub dataset: MatrixPair,
    /// Whole feature matrix, scaled with a whole-dataset scaler.
    pub scaled_x: Array2<f64>,
    /// Training partition, scaled with the train-only scaler.
    pub train: MatrixPair,
    /// Validation partition, transformed by the train-only scaler.
    pub valid: MatrixPair,
}

type MlCacheKey = (PathBuf, u64, u64, PathBuf);

static ML_CACHE: OnceLock<Mutex<HashMap<MlCacheKey, Arc<MlData>>>> = OnceLock::new();

impl MlData {
    /// Build the prepared matrices, or return the cached object for the
    /// identical argument tuple.
    pub fn build(
        project: Arc<ProjectData>,
        validation_split: f64,
        seed: u64,
        config: &ProjectConfig,
    ) -> Result<Arc<Self>> {
        if !(validation_split > 0.0 && validation_split < 1.0) {
            return Err(HeartPredictError::ValidationError(format!(
                "validation split must be in (0, 1), got {validation_split}"
            )));
        }

        let key: MlCacheKey = (
            project.path().to_path_buf(),
            validation_split.to_bits(),
            seed,
            config.results_dir.clone(),
        );

        let cache = ML_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        let mut cache = cache.lock().expect("ml data cache poisoned");
        if let Some(data) = cache.get(&key) {
            return Ok(Arc::clone(data));
        }

        let data = Arc::new(Self::prepare(project, validation_split, seed, config)?);
        cache.insert(key, Arc::clone(&data));
        Ok(data)
    }

    fn prepare(
        project: Arc<ProjectData>,
        validation_split: f64,
        seed: u64,
        config: &ProjectConfig,
    ) -> Result<Self> {
        let dataset = project.feature_label_split()?;
        let n = dataset.x.nrows();
        if n < 2 {
            return Err(HeartPredictError::ValidationError(format!(
                "need at least 2 rows to split, got {n}"
            )));
        }

        // Whole-dataset scaler, for consumers outside the train/valid loop.
        let mut whole_scaler = StandardScaler::new();
        let scaled_x = whole_scaler.fit_transform(&dataset.x)?;
        whole_scaler.save(&config.scaler_file())?;

        let (valid_idx, train_idx) = seeded_split(n, validation_split, seed);
        if train_idx.is_empty() {
            return Err(HeartPredictError::ValidationError(format!(
                "validation split {validation_split} leaves no training rows"
            )));
        }

        let x_train_raw = dataset.x.select(Axis(0), &train_idx);
        let x_valid_raw = dataset.x.select(Axis(0), &valid_idx);
        let y_train: Array1<f64> = train_idx.iter().map(|&i| dataset.y[i]).collect();
        let y_valid: Array1<f64> = valid_idx.iter().map(|&i| dataset.y[i]).collect();

        // Train-only scaler; validation data is transformed, never refit.
        let mut split_scaler = StandardScaler::new();
        let x_train = split_scaler.fit_transform(&x_train_raw)?;
        let x_valid = split_scaler.transform(&x_valid_raw)?;
        split_scaler.save(&config.scaler_file())?;

        tracing::info!(
            rows = n,
            train = train_idx.len(),
            valid = valid_idx.len(),
            seed,
            "prepared train/validation matrices"
        );

        Ok(Self {
            project,
            validation_split,
            seed,
            dataset,
            scaled_x,
            train: MatrixPair { x: x_train, y: y_train },
            valid: MatrixPair { x: x_valid, y: y_valid },
        })
    }

    /// The underlying table.
    pub fn project(&self) -> &Arc<ProjectData> {
        &self.project
    }

    /// Validation fraction used for the split.
    pub fn validation_split(&self) -> f64 {
        self.validation_split
    }

    /// Seed used for the split.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_seeded_split_reproducible() {
        let (valid_a, train_a) = seeded_split(100, 0.2, 42);
        let (valid_b, train_b) = seeded_split(100, 0.2, 42);
        assert_eq!(valid_a, valid_b);
        assert_eq!(train_a, train_b);
        assert_eq!(valid_a.len(), 20);
        assert_eq!(train_a.len(), 80);
    }

    #[test]
    fn test_seeded_split_differs_by_seed() {
        let (valid_a, _) = seeded_split(100, 0.2, 42);
        let (valid_b, _) = seeded_split(100, 0.2, 43);
        assert_ne!(valid_a, valid_b);
    }

    #[test]
    fn test_seeded_split_partitions_all_rows() {
        let (valid, train) = seeded_split(299, 0.2, 7);
        assert_eq!(valid.len() + train.len(), 299);
        let mut all: Vec<usize> = valid.iter().chain(train.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..299).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_split_ceils_validation_size() {
        let (valid, train) = seeded_split(10, 0.25, 1);
        assert_eq!(valid.len(), 3);
        assert_eq!(train.len(), 7);
    }

    fn write_fixture_csv(dir: &Path) -> PathBuf {
        let path = dir.join("records.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "age,anaemia,creatinine_phosphokinase,diabetes,ejection_fraction,\
             high_blood_pressure,platelets,serum_creatinine,serum_sodium,sex,\
             smoking,time,DEATH_EVENT"
        )
        .unwrap();
        for i in 0..10 {
            let death = i % 3 == 0;
            writeln!(
                file,
                "{},0,{},1,{},0,{},1.{},13{},1,0,{},{}",
                50 + i,
                100 + 10 * i,
                30 + i,
                250000 + 100 * i,
                i,
                i % 7,
                20 + 5 * i,
                u8::from(death),
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_build_missing_file_errors() {
        let err = ProjectData::build(Path::new("no/such/file.csv")).unwrap_err();
        assert!(matches!(err, HeartPredictError::DatasetNotFound { .. }));
        assert!(err.to_string().contains("no/such/file.csv"));
    }

    #[test]
    fn test_build_rejects_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "age,sex").unwrap();
        writeln!(file, "60,1").unwrap();

        let err = ProjectData::build(&path).unwrap_err();
        assert!(matches!(err, HeartPredictError::MalformedDataset { .. }));
        assert!(err.to_string().contains("DEATH_EVENT"));
    }

    #[test]
    fn test_project_cache_returns_same_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_csv(dir.path());

        let a = ProjectData::build(&path).unwrap();
        let b = ProjectData::build(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_ml_data_shapes_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_csv(dir.path());
        let config = ProjectConfig::with_csv(&path).with_results_dir(dir.path().join("results"));

        let project = ProjectData::build(&path).unwrap();
        let data = MlData::build(Arc::clone(&project), 0.2, 42, &config).unwrap();

        assert_eq!(data.dataset.x.nrows(), 10);
        assert_eq!(data.dataset.x.ncols(), 12);
        assert_eq!(data.train.x.nrows() + data.valid.x.nrows(), 10);
        assert_eq!(data.train.x.nrows(), data.train.y.len());
        assert_eq!(data.valid.x.nrows(), data.valid.y.len());
        assert!(config.scaler_file().exists());

        let again = MlData::build(project, 0.2, 42, &config).unwrap();
        assert!(Arc::ptr_eq(&data, &again));
    }

    #[test]
    fn test_ml_data_rejects_bad_fraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_csv(dir.path());
        let config = ProjectConfig::with_csv(&path).with_results_dir(dir.path().join("results"));
        let project = ProjectData::build(&path).unwrap();

        assert!(MlData::build(Arc::clone(&project), 0.0, 42, &config).is_err());
        assert!(MlData::build(project, 1.0, 42, &config).is_err());
    }
}
