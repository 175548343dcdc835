//! Forecast command implementations
//!
//! `forecast` runs the baseline trend forecaster; `train-forecast` fits the
//! LSTM sequence forecaster on a dated CSV and predicts past its end.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use mentor_core::{BaselineForecaster, SequenceForecaster, TimeSeries};

use super::{format_amounts, load_config};

pub fn cmd_forecast(
    config_path: Option<&Path>,
    history: &[f64],
    horizon: Option<usize>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let forecaster = BaselineForecaster::new(config.forecast.clone())?;
    let horizon = horizon.unwrap_or(config.forecast.horizon);

    let forecast = match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            forecaster.forecast_with_rng(history, horizon, &mut rng)?
        }
        None => forecaster.forecast(history, horizon)?,
    };

    if json {
        println!("{}", serde_json::json!({ "forecast": forecast }));
        return Ok(());
    }

    println!("📈 Baseline forecast ({} periods)", forecast.len());
    println!("   History:  {}", format_amounts(history));
    println!("   Forecast: {}", format_amounts(&forecast));
    Ok(())
}

/// Options for `train-forecast`
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub monthly: bool,
    pub periods: usize,
    pub window: Option<usize>,
    pub epochs: Option<usize>,
}

pub fn cmd_train_forecast(
    config_path: Option<&Path>,
    file: &Path,
    options: TrainOptions,
    json: bool,
) -> Result<()> {
    if options.periods == 0 {
        bail!("--periods must be at least 1");
    }

    let mut config = load_config(config_path)?.sequence;
    if let Some(window) = options.window {
        config.window = window;
    }
    if let Some(epochs) = options.epochs {
        config.epochs = epochs;
    }

    let series = TimeSeries::from_path(file)
        .with_context(|| format!("Failed to read series from {}", file.display()))?;
    let series = if options.monthly {
        series.monthly_totals()
    } else {
        series
    };
    let values = series.values();

    info!(
        points = values.len(),
        window = config.window,
        epochs = config.epochs,
        "Training sequence forecaster"
    );

    let mut forecaster = SequenceForecaster::new(config)?;
    let report = forecaster.train(&values)?;
    let forecast = forecaster.predict(&values, options.periods)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": report,
                "forecast": forecast,
            }))?
        );
        return Ok(());
    }

    let last = series.points().last().map(|p| p.date.to_string());
    println!("🧠 Trained on {} windows from {}", report.samples, file.display());
    println!(
        "   Loss: {:.6} → {:.6} over {} epochs",
        report.initial_loss, report.final_loss, report.epochs
    );
    if let Some(last) = last {
        println!("   Series ends: {}", last);
    }
    println!("   Forecast: {}", format_amounts(&forecast));
    Ok(())
}
