//! heartpredict CLI
//!
//! Command-line interface for descriptive statistics, correlation analysis,
//! model training and survival plots.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;

use crate::config::{ProjectConfig, DEFAULT_CSV};
use crate::correlation::{CorrelationBackend, CorrelationMethod};
use crate::data::{Column, MlData, ProjectData};
use crate::descriptive::{BoolColumn, DescriptiveBackend, DiscreteColumn};
use crate::survival::SurvivalBackend;
use crate::training::MlBackend;

/// Validation fraction used by every training command.
const VALIDATION_SPLIT: f64 = 0.2;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

/// Log verbosity for the `--loglevel` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Filter directive understood by the tracing subscriber.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "heartpredict")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-failure survival prediction from clinical records")]
pub struct Cli {
    /// Source CSV with one row per subject
    #[arg(long, global = true, default_value = DEFAULT_CSV)]
    pub csv: PathBuf,

    /// Log verbosity
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the tool version
    Version,

    /// Train the classifier roster and keep the most accurate model
    TrainModelForClassification {
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Train the regressor roster and keep the lowest-error model
    TrainModelForRegression {
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Render a Kaplan-Meier plot stratified by a regressor's predictions
    CreateKaplanMeierPlot {
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Path to a persisted regressor; trains one when omitted
        #[arg(long)]
        regressor: Option<PathBuf>,
    },

    /// Correlation between one column and the death-event label
    #[command(name = "cc")]
    SingleCorrelation {
        /// Column to correlate
        #[arg(long, value_enum)]
        column: Column,

        /// Correlation method
        #[arg(long, value_enum, default_value_t = CorrelationMethod::Pearson)]
        method: CorrelationMethod,
    },

    /// Full pairwise correlation matrix
    #[command(name = "cm")]
    MultipleCorrelation {
        /// Correlation method
        #[arg(long, value_enum, default_value_t = CorrelationMethod::Pearson)]
        method: CorrelationMethod,
    },

    /// Zero/one proportions of a boolean-coded column
    #[command(name = "bstat")]
    BooleanStatistic {
        /// Column to summarize
        #[arg(value_enum)]
        column: BoolColumn,
    },

    /// Summary statistics of a continuous column
    #[command(name = "dstat")]
    DiscreteStatistic {
        /// Column to summarize
        #[arg(value_enum)]
        column: DiscreteColumn,
    },
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ProjectConfig::with_csv(cli.csv);

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::TrainModelForClassification { seed } => cmd_train_classification(&config, seed),
        Commands::TrainModelForRegression { seed } => cmd_train_regression(&config, seed),
        Commands::CreateKaplanMeierPlot { seed, regressor } => {
            cmd_kaplan_meier(&config, seed, regressor)
        }
        Commands::SingleCorrelation { column, method } => {
            cmd_single_correlation(&config, column, method)
        }
        Commands::MultipleCorrelation { method } => cmd_correlation_matrix(&config, method),
        Commands::BooleanStatistic { column } => cmd_boolean_statistic(&config, column),
        Commands::DiscreteStatistic { column } => cmd_discrete_statistic(&config, column),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn build_ml_backend(config: &ProjectConfig, seed: u64) -> anyhow::Result<MlBackend> {
    let project = ProjectData::build(&config.csv)?;
    let data = MlData::build(project, VALIDATION_SPLIT, seed, config)?;
    Ok(MlBackend::new(data, config.results_dir.clone()))
}

fn cmd_train_classification(config: &ProjectConfig, seed: u64) -> anyhow::Result<()> {
    let backend = build_ml_backend(config, seed)?;
    let outcome = backend.classification_for_different_classifiers()?;

    section("Classification");
    println!(
        "  {:<12} {}",
        muted("Best model"),
        outcome.model_file.display()
    );
    println!(
        "  {:<12} {}",
        muted("Accuracy"),
        format!("{:.3}", outcome.score).white().bold()
    );
    println!();
    Ok(())
}

fn cmd_train_regression(config: &ProjectConfig, seed: u64) -> anyhow::Result<()> {
    let backend = build_ml_backend(config, seed)?;
    let outcome = backend.regression_for_different_regressors()?;

    section("Regression");
    println!(
        "  {:<12} {}",
        muted("Best model"),
        outcome.model_file.display()
    );
    println!(
        "  {:<12} {}",
        muted("RMSE"),
        format!("{:.3}", outcome.score).white().bold()
    );
    println!();
    Ok(())
}

fn cmd_kaplan_meier(
    config: &ProjectConfig,
    seed: u64,
    regressor: Option<PathBuf>,
) -> anyhow::Result<()> {
    let project = ProjectData::build(&config.csv)?;
    let data = MlData::build(project, VALIDATION_SPLIT, seed, config)?;

    let regressor = match regressor {
        Some(path) => path,
        None => {
            let backend = MlBackend::new(data.clone(), config.results_dir.clone());
            backend.regression_for_different_regressors()?.model_file
        }
    };

    let survival = SurvivalBackend::new(data);
    let plot = survival.create_kaplan_meier_plot_for(&regressor, &config.kaplan_meier_file())?;

    section("Kaplan-Meier");
    println!("  {:<12} {}", muted("Regressor"), regressor.display());
    println!("  {} {}", ok("✓"), plot.display());
    println!();
    Ok(())
}

fn cmd_single_correlation(
    config: &ProjectConfig,
    column: Column,
    method: CorrelationMethod,
) -> anyhow::Result<()> {
    let project = ProjectData::build(&config.csv)?;
    let backend = CorrelationBackend::build(project);
    let corr = backend.get_column_correlation_to_death_event(column, method)?;
    println!("{corr:.4}");
    Ok(())
}

fn cmd_correlation_matrix(config: &ProjectConfig, method: CorrelationMethod) -> anyhow::Result<()> {
    let project = ProjectData::build(&config.csv)?;
    let backend = CorrelationBackend::build(project);
    let matrix = backend.get_correlation_matrix(method)?;
    println!("{matrix}");
    Ok(())
}

fn cmd_boolean_statistic(config: &ProjectConfig, column: BoolColumn) -> anyhow::Result<()> {
    let project = ProjectData::build(&config.csv)?;
    let backend = DescriptiveBackend::new(project);
    let stats = backend.calculate_boolean_statistics(column)?;
    println!("{stats}");
    Ok(())
}

fn cmd_discrete_statistic(config: &ProjectConfig, column: DiscreteColumn) -> anyhow::Result<()> {
    let project = ProjectData::build(&config.csv)?;
    let backend = DescriptiveBackend::new(project);
    let stats = backend.calculate_discrete_statistics(column)?;
    println!("{stats}");
    Ok(())
}
