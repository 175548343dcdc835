//! Transaction categorization handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AppError, AppState};
use mentor_core::LabelScore;

/// Maximum descriptions per batch request
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    pub description: String,
    /// Include per-category scores in the response
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Serialize)]
pub struct CategorizeResponse {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_applied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<LabelScore>>,
}

/// POST /api/categorize - Categorize one transaction description
pub async fn categorize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CategorizeRequest>,
) -> Result<Json<CategorizeResponse>, AppError> {
    if !request.detailed {
        let category = state.engine.categorize(&request.description).await?;
        return Ok(Json(CategorizeResponse {
            category,
            fallback_applied: None,
            scores: None,
        }));
    }

    let result = state
        .engine
        .categorize_detailed(&request.description)
        .await?;
    Ok(Json(CategorizeResponse {
        category: result.category,
        fallback_applied: Some(result.fallback_applied),
        scores: Some(result.scores),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BatchCategorizeRequest {
    pub descriptions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchCategorizeResponse {
    /// Same length and order as the request's descriptions
    pub categories: Vec<String>,
}

/// POST /api/categorize/batch - Categorize many descriptions
pub async fn categorize_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchCategorizeRequest>,
) -> Result<Json<BatchCategorizeResponse>, AppError> {
    if request.descriptions.len() > MAX_BATCH_SIZE {
        return Err(AppError::bad_request(&format!(
            "At most {} descriptions per batch",
            MAX_BATCH_SIZE
        )));
    }

    let categories = state
        .engine
        .batch_categorize(&request.descriptions)
        .await?;
    debug!(count = categories.len(), "Batch categorized");

    Ok(Json(BatchCategorizeResponse { categories }))
}
