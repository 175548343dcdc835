//! BudgetMentor CLI - Spending predictions from the command line
//!
//! Usage:
//!   mentor categorize "UBER *TRIP"         Categorize a transaction
//!   mentor profile 250 80 40                Classify a spending profile
//!   mentor forecast --history 120,95,130    Baseline forecast
//!   mentor train-forecast --file spend.csv  Train the LSTM forecaster and predict
//!   mentor serve --port 8000                Start the API server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { port, host } => commands::cmd_serve(config_path, &host, port).await,
        Commands::Categorize {
            descriptions,
            detailed,
        } => commands::cmd_categorize(config_path, &descriptions, detailed, cli.json).await,
        Commands::Profile { amounts } => commands::cmd_profile(config_path, &amounts, cli.json),
        Commands::Forecast {
            history,
            horizon,
            seed,
        } => commands::cmd_forecast(config_path, &history, horizon, seed, cli.json),
        Commands::TrainForecast {
            file,
            monthly,
            periods,
            window,
            epochs,
        } => commands::cmd_train_forecast(
            config_path,
            &file,
            commands::TrainOptions {
                monthly,
                periods,
                window,
                epochs,
            },
            cli.json,
        ),
        Commands::Config => commands::cmd_config(config_path),
    }
}
