//! BudgetMentor Prediction Server
//!
//! Axum-based REST API over the predictive core: transaction categorization,
//! spending profiles, and spending forecasts.
//!
//! The server is meant to sit next to the BudgetMentor web app on a trusted
//! network. It has no authentication; CORS is limited to the configured
//! origins.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use mentor_core::{EntailmentBackend, Error as CoreError, PredictiveEngine};

mod handlers;

/// Origin of the BudgetMentor web app in development
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Seconds clients should wait before retrying a busy or unavailable model
const RETRY_AFTER_SECS: u64 = 5;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    /// Read `MENTOR_ALLOWED_ORIGINS` (comma-separated), falling back to the
    /// development origin
    pub fn from_env() -> Self {
        match std::env::var("MENTOR_ALLOWED_ORIGINS") {
            Ok(origins) => Self {
                allowed_origins: parse_origins(&origins),
            },
            Err(_) => Self::default(),
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub engine: PredictiveEngine,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(engine: PredictiveEngine, config: ServerConfig) -> Router {
    create_router_with_state(Arc::new(AppState {
        engine,
        config,
    }))
}

/// Create the router over existing state (lets callers keep a handle for
/// shutdown)
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Categorization
        .route("/categorize", post(handlers::categorize))
        .route("/categorize/batch", post(handlers::categorize_batch))
        // Spending profile (predict-cluster is the legacy path)
        .route("/profile", post(handlers::profile))
        .route("/predict-cluster", post(handlers::profile))
        // Forecasting
        .route("/forecast", post(handlers::forecast))
        .route("/forecast/train", post(handlers::train_forecaster))
        .route("/forecast/predict", post(handlers::predict_forecast))
        .route("/forecast/status", get(handlers::forecaster_status));

    // Build CORS layer
    let cors = if state.config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server and run until Ctrl-C
pub async fn serve(
    engine: PredictiveEngine,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_backend_connection(&engine).await;

    let state = Arc::new(AppState { engine, config });
    let app = create_router_with_state(state.clone());
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    state.engine.shutdown().await;
    info!("Server stopped");

    Ok(())
}

/// Check and log semantic backend status; the categorizer itself starts on
/// first use
async fn check_backend_connection(engine: &PredictiveEngine) {
    let status = engine.status().await;
    match engine.categorizer().await {
        Ok(categorizer) => info!(
            "Semantic backend connected: {} (model: {})",
            categorizer.backend().host(),
            categorizer.backend().model()
        ),
        Err(_) => warn!(
            "Semantic backend not responding: {} (model: {}); categorization will retry on demand",
            status.backend.host, status.backend.model
        ),
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    kind: &'static str,
    /// (expected, actual) for size errors
    context: Option<(usize, usize)>,
    retry_after: bool,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            kind: "invalid_input",
            context: None,
            retry_after: false,
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            kind: "internal",
            context: None,
            retry_after: false,
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let (status, context, retry_after) = match &err {
            CoreError::InsufficientHistory { required, actual } => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some((*required, *actual)), false)
            }
            CoreError::DimensionMismatch { expected, actual } => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some((*expected, *actual)), false)
            }
            CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, None, false),
            CoreError::ModelNotTrained => (StatusCode::CONFLICT, None, false),
            CoreError::ModelBusy | CoreError::ModelUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, None, true)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None, false),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Self {
                status,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                kind: "internal",
                context: None,
                retry_after: false,
                // Keep full error for logging
                internal: Some(err.into()),
            };
        }

        Self {
            status,
            message: err.to_string(),
            kind: err.kind(),
            context,
            retry_after,
            internal: None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred".to_string(),
            kind: "internal",
            context: None,
            retry_after: false,
            internal: Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let mut body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });
        if let Some((expected, actual)) = self.context {
            body["expected"] = expected.into();
            body["actual"] = actual.into();
        }

        let mut response = (self.status, Json(body)).into_response();
        if self.retry_after {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(RETRY_AFTER_SECS),
            );
        }
        response
    }
}
