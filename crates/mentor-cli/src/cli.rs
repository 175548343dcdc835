//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// BudgetMentor - Predict where your money goes
#[derive(Parser)]
#[command(name = "mentor")]
#[command(about = "Spending categorization, profiles, and forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Categorize transaction descriptions
    Categorize {
        /// One or more descriptions (e.g. "UBER *TRIP")
        #[arg(required = true)]
        descriptions: Vec<String>,

        /// Show every category's score
        #[arg(short, long)]
        detailed: bool,
    },

    /// Classify a spending profile into an archetype
    Profile {
        /// Amounts in configured feature order (default: food transport entertainment)
        #[arg(required = true)]
        amounts: Vec<f64>,
    },

    /// Baseline forecast from recent history
    Forecast {
        /// Historical amounts, oldest first (comma-separated)
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        history: Vec<f64>,

        /// Periods to forecast (default from config)
        #[arg(long)]
        horizon: Option<usize>,

        /// Seed for reproducible noise
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Train the sequence forecaster on a dated CSV and predict ahead
    TrainForecast {
        /// CSV with `date,amount` columns (YYYY-MM-DD dates)
        #[arg(short, long)]
        file: PathBuf,

        /// Sum amounts per calendar month before training
        #[arg(long)]
        monthly: bool,

        /// Periods to predict after the end of the series
        #[arg(short, long, default_value = "4")]
        periods: usize,

        /// Override the configured window size
        #[arg(long)]
        window: Option<usize>,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Show the active configuration
    Config,
}
