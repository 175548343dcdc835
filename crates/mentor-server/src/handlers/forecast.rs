//! Forecast handlers
//!
//! Training and prediction of the sequence model run on the blocking pool so
//! a long fit never stalls the async workers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use mentor_core::{ForecasterState, TrainingReport};

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    #[serde(alias = "spending")]
    pub history: Vec<f64>,
    /// Periods to forecast (default from config)
    pub horizon: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub forecast: Vec<f64>,
}

/// POST /api/forecast - Baseline trend forecast
pub async fn forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResponse>, AppError> {
    let forecast = state.engine.forecast(&request.history, request.horizon)?;
    Ok(Json(ForecastResponse { forecast }))
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    #[serde(alias = "series")]
    pub history: Vec<f64>,
}

/// POST /api/forecast/train - Train the sequence forecaster
pub async fn train_forecaster(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<TrainingReport>, AppError> {
    let forecaster = state.engine.sequence().clone();
    let observations = request.history.len();

    let report = tokio::task::spawn_blocking(move || forecaster.train(&request.history))
        .await
        .map_err(|e| AppError::from(anyhow::Error::new(e).context("Training task failed")))??;

    info!(
        observations,
        samples = report.samples,
        final_loss = report.final_loss,
        "Sequence forecaster trained via API"
    );
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub recent: Vec<f64>,
    /// Periods to predict (default from config)
    pub periods: Option<usize>,
}

/// POST /api/forecast/predict - Autoregressive sequence forecast
pub async fn predict_forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<ForecastResponse>, AppError> {
    let forecaster = state.engine.sequence().clone();
    let periods = request
        .periods
        .unwrap_or(state.engine.config().forecast.horizon);

    let forecast = tokio::task::spawn_blocking(move || forecaster.predict(&request.recent, periods))
        .await
        .map_err(|e| AppError::from(anyhow::Error::new(e).context("Prediction task failed")))??;

    Ok(Json(ForecastResponse { forecast }))
}

/// GET /api/forecast/status - Sequence forecaster state
///
/// Answers immediately while a fit is running, with `training: true`.
pub async fn forecaster_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ForecasterState>, AppError> {
    Ok(Json(state.engine.sequence().state()?))
}
