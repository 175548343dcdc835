//! Spending profile handler

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub archetype: String,
    /// Same label as `archetype`, under the key older clients read
    pub cluster: String,
    pub cluster_index: usize,
}

/// POST /api/profile - Classify a spending profile into an archetype
///
/// Also served at the legacy path `/api/predict-cluster`. The body maps each
/// configured feature to an amount, e.g.
/// `{"food": 250.0, "transport": 80.0, "entertainment": 40.0}`.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Json(amounts): Json<BTreeMap<String, f64>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let model = state.engine.profile_model();
    let vector = model.vector_from_features(&amounts)?;
    let assignment = state.engine.classify_profile(&vector)?;

    Ok(Json(ProfileResponse {
        cluster: assignment.archetype.clone(),
        archetype: assignment.archetype,
        cluster_index: assignment.cluster,
    }))
}
