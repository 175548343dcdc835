//! Health handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use mentor_core::EngineStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub engine: EngineStatus,
}

/// GET /api/health - Liveness plus model state
///
/// Does not start the categorizer; `categorizer_ready` turns true after the
/// first successful categorization.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        engine: state.engine.status().await,
    })
}
