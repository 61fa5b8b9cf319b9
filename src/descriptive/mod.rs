//! Descriptive statistics over the loaded table
//!
//! Read-only views; nothing here is persisted.

use crate::data::{Column, ProjectData};
use crate::error::{HeartPredictError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Boolean-coded columns (0/1 values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum BoolColumn {
    Anaemia,
    Diabetes,
    HighBloodPressure,
    Sex,
    Smoking,
    DeathEvent,
}

impl BoolColumn {
    /// The underlying table column.
    pub fn as_column(&self) -> Column {
        match self {
            BoolColumn::Anaemia => Column::Anaemia,
            BoolColumn::Diabetes => Column::Diabetes,
            BoolColumn::HighBloodPressure => Column::HighBloodPressure,
            BoolColumn::Sex => Column::Sex,
            BoolColumn::Smoking => Column::Smoking,
            BoolColumn::DeathEvent => Column::DeathEvent,
        }
    }
}

/// Continuous or count-valued columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum DiscreteColumn {
    Age,
    CreatininePhosphokinase,
    EjectionFraction,
    Platelets,
    SerumCreatinine,
    SerumSodium,
    Time,
}

impl DiscreteColumn {
    /// The underlying table column.
    pub fn as_column(&self) -> Column {
        match self {
            DiscreteColumn::Age => Column::Age,
            DiscreteColumn::CreatininePhosphokinase => Column::CreatininePhosphokinase,
            DiscreteColumn::EjectionFraction => Column::EjectionFraction,
            DiscreteColumn::Platelets => Column::Platelets,
            DiscreteColumn::SerumCreatinine => Column::SerumCreatinine,
            DiscreteColumn::SerumSodium => Column::SerumSodium,
            DiscreteColumn::Time => Column::Time,
        }
    }
}

/// Zero/one proportions of a boolean-coded column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanStatistics {
    pub name: String,
    pub zero: f64,
    pub one: f64,
}

impl fmt::Display for BooleanStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  zero  {:.4}", self.zero)?;
        write!(f, "  one   {:.4}", self.one)
    }
}

/// Summary statistics of a continuous column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteStatistics {
    pub name: String,
    pub minimum: f64,
    pub maximum: f64,
    pub median: f64,
    pub mean: f64,
    pub standard_dev: f64,
}

impl fmt::Display for DiscreteStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  min     {:.4}", self.minimum)?;
        writeln!(f, "  max     {:.4}", self.maximum)?;
        writeln!(f, "  median  {:.4}", self.median)?;
        writeln!(f, "  mean    {:.4}", self.mean)?;
        write!(f, "  std     {:.4}", self.standard_dev)
    }
}

/// Comparison used by [`DescriptiveBackend::conditional_subset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
}

impl Relation {
    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Relation::Less => value < threshold,
            Relation::LessEq => value <= threshold,
            Relation::Greater => value > threshold,
            Relation::GreaterEq => value >= threshold,
            Relation::Equal => value == threshold,
        }
    }
}

impl FromStr for Relation {
    type Err = HeartPredictError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(Relation::Less),
            "<=" => Ok(Relation::LessEq),
            ">" => Ok(Relation::Greater),
            ">=" => Ok(Relation::GreaterEq),
            "==" => Ok(Relation::Equal),
            other => Err(HeartPredictError::ValidationError(format!(
                "unknown relation: {other}"
            ))),
        }
    }
}

/// Computes read-only summary statistics over the loaded table.
pub struct DescriptiveBackend {
    project: Arc<ProjectData>,
}

impl DescriptiveBackend {
    /// Create a backend over the loaded table.
    pub fn new(project: Arc<ProjectData>) -> Self {
        Self { project }
    }

    fn column_f64(&self, column: Column) -> Result<Vec<f64>> {
        let series = self
            .project
            .df()
            .column(column.as_str())
            .map_err(|_| HeartPredictError::ColumnNotFound(column.as_str().to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.f64()?.into_iter().flatten().collect())
    }

    /// Zero/one proportions of a boolean-coded column, relative to the
    /// table's row count.
    pub fn calculate_boolean_statistics(&self, column: BoolColumn) -> Result<BooleanStatistics> {
        let values = self.column_f64(column.as_column())?;
        let n = self.project.df().height() as f64;
        if n == 0.0 {
            return Err(HeartPredictError::DataError("empty table".to_string()));
        }

        let ones = values.iter().filter(|&&v| v.round() as i64 == 1).count() as f64;
        let zeros = values.iter().filter(|&&v| v.round() as i64 == 0).count() as f64;

        Ok(BooleanStatistics {
            name: column.as_column().as_str().to_string(),
            zero: zeros / n,
            one: ones / n,
        })
    }

    /// Summary statistics of a continuous column. The standard deviation
    /// uses the sample estimator (ddof 1).
    pub fn calculate_discrete_statistics(&self, column: DiscreteColumn) -> Result<DiscreteStatistics> {
        let series = self
            .project
            .df()
            .column(column.as_column().as_str())
            .map_err(|_| {
                HeartPredictError::ColumnNotFound(column.as_column().as_str().to_string())
            })?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let ca = series.f64()?;

        let missing = || HeartPredictError::DataError(format!(
            "column {} has no values",
            column.as_column().as_str()
        ));

        Ok(DiscreteStatistics {
            name: column.as_column().as_str().to_string(),
            minimum: ca.min().ok_or_else(missing)?,
            maximum: ca.max().ok_or_else(missing)?,
            median: ca.median().ok_or_else(missing)?,
            mean: ca.mean().ok_or_else(missing)?,
            standard_dev: ca.std(1).ok_or_else(missing)?,
        })
    }

    /// Rows of `df` where `column` satisfies the relation against `num`.
    pub fn conditional_subset(
        &self,
        df: &DataFrame,
        column: &str,
        num: f64,
        relation: Relation,
    ) -> Result<DataFrame> {
        let series = df
            .column(column)
            .map_err(|_| HeartPredictError::ColumnNotFound(column.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let mask: BooleanChunked = series
            .f64()?
            .into_iter()
            .map(|opt| opt.map(|v| relation.holds(v, num)))
            .collect();
        Ok(df.filter(&mask)?)
    }

    /// Counts of each rounded value in a column, ordered by value.
    pub fn variable_distribution(&self, column: Column) -> Result<BTreeMap<i64, usize>> {
        let values = self.column_f64(column)?;
        let mut counts = BTreeMap::new();
        for v in values {
            *counts.entry(v.round() as i64).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
