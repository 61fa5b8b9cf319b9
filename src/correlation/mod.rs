//! Pairwise correlation between table columns
//!
//! Read-only views; supports Pearson's r and Spearman's rank correlation
//! (Pearson over average ranks, so ties are handled).

use crate::data::{column_to_array1, Column, ProjectData};
use crate::error::Result;
use polars::prelude::*;
use std::sync::Arc;

/// Correlation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CorrelationMethod {
    /// Linear correlation (Pearson's r)
    Pearson,
    /// Rank correlation (Spearman's rho)
    Spearman,
}

/// Pearson correlation coefficient. Returns 0.0 when either input is
/// degenerate (constant or empty).
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}

/// Spearman rank correlation: Pearson over average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// 1-based ranks; tied values share the average of their rank range.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // ranks i+1 ..= j+1 share their average
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Computes correlations over the loaded table.
pub struct CorrelationBackend {
    project: Arc<ProjectData>,
}

impl CorrelationBackend {
    /// Create a backend over the loaded table.
    pub fn build(project: Arc<ProjectData>) -> Self {
        Self { project }
    }

    fn column_values(&self, column: Column) -> Result<Vec<f64>> {
        Ok(column_to_array1(self.project.df(), column)?.to_vec())
    }

    fn correlate(&self, a: &[f64], b: &[f64], method: CorrelationMethod) -> f64 {
        match method {
            CorrelationMethod::Pearson => pearson(a, b),
            CorrelationMethod::Spearman => spearman(a, b),
        }
    }

    /// Correlation between one column and the death-event label.
    pub fn get_column_correlation_to_death_event(
        &self,
        column: Column,
        method: CorrelationMethod,
    ) -> Result<f64> {
        let a = self.column_values(column)?;
        let b = self.column_values(Column::DeathEvent)?;
        Ok(self.correlate(&a, &b, method))
    }

    /// Full pairwise correlation matrix over all columns, label included.
    /// The first output column names the row variable.
    pub fn get_correlation_matrix(&self, method: CorrelationMethod) -> Result<DataFrame> {
        let values: Vec<Vec<f64>> = Column::ALL
            .iter()
            .map(|&c| self.column_values(c))
            .collect::<Result<Vec<_>>>()?;

        let names: Vec<&str> = Column::ALL.iter().map(|c| c.as_str()).collect();
        let mut columns: Vec<polars::prelude::Column> =
            vec![Series::new("column".into(), names.as_slice()).into()];

        for (j, col) in Column::ALL.iter().enumerate() {
            let corr: Vec<f64> = (0..Column::ALL.len())
                .map(|i| self.correlate(&values[i], &values[j], method))
                .collect();
            columns.push(Series::new(col.as_str().into(), corr).into());
        }

        Ok(DataFrame::new(columns)?)
    }
}
