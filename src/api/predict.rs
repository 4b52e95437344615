//! Prediction endpoint handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Upload};

/// Filename reported for the built-in sample
pub const DEMO_FILENAME: &str = "demo";

const INDEX_TEXT: &str = "SageMaker model façade. POST a file as multipart field 'file' to \
/predict (an image for the digit classifier, UTF-8 text for the topic model), or GET /demo \
to run a built-in sample.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub filename: String,
    pub prediction: Value,
}

/// GET /
pub async fn index() -> &'static str {
    INDEX_TEXT
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    upload: Upload,
) -> Result<Json<PredictionResponse>, ApiError> {
    debug!(
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        mode = ?state.predictor.mode(),
        "Predicting uploaded file"
    );

    let prediction = state
        .predictor
        .predict(&upload.bytes)
        .await
        .map_err(ApiError::from)?;

    info!(filename = %upload.filename, prediction = %prediction, "Prediction served");

    Ok(Json(PredictionResponse {
        filename: upload.filename,
        prediction,
    }))
}

/// GET /demo
pub async fn demo(State(state): State<AppState>) -> Result<Json<PredictionResponse>, ApiError> {
    let prediction = state
        .predictor
        .predict_demo()
        .await
        .map_err(ApiError::from)?;

    info!(prediction = %prediction, "Demo prediction served");

    Ok(Json(PredictionResponse {
        filename: DEMO_FILENAME.to_string(),
        prediction,
    }))
}
