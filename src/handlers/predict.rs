//! Prediction handlers - single, batch and history

use axum::{
    extract::{Query, State},
    Json,
};

use crate::ml::{prepare_features, validate_input};
use crate::models::{HistoryFilter, PredictRequest, PredictResponse, PredictionRecord};
use crate::{AppError, AppResult, AppState};

/// Predict attrition risk for one employee
pub async fn predict_attrition(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    let response = run_prediction(&state, &request).await?;
    Ok(Json(response))
}

/// Predict attrition risk for several employees in one request.
///
/// The output list always has the same length and order as the input list;
/// a failed item becomes a sentinel slot instead of aborting the batch.
pub async fn predict_attrition_batch(
    State(state): State<AppState>,
    Json(requests): Json<Vec<PredictRequest>>,
) -> AppResult<Json<Vec<PredictResponse>>> {
    let mut responses = Vec::with_capacity(requests.len());

    for request in &requests {
        match run_prediction(&state, request).await {
            Ok(response) => responses.push(response),
            Err(err) => {
                let detail = err.detail();
                tracing::warn!(employee_id = ?request.employee_id, %detail, "batch item failed");
                responses.push(PredictResponse::failure(request.employee_id, &detail));
            }
        }
    }

    Ok(Json(responses))
}

/// Prediction history, newest first
pub async fn prediction_history(
    State(state): State<AppState>,
    Query(filter): Query<HistoryFilter>,
) -> AppResult<Json<Vec<PredictionRecord>>> {
    let records = PredictionRecord::list(&state.pool, filter).await?;
    Ok(Json(records))
}

/// Validate, assemble, infer, persist - shared by single and batch paths.
async fn run_prediction(
    state: &AppState,
    request: &PredictRequest,
) -> Result<PredictResponse, AppError> {
    // On-demand load when startup loading failed
    if !state.model.ensure_loaded() {
        return Err(AppError::ModelUnavailable);
    }

    let input = request.to_input_map();

    let report = validate_input(&serde_json::Value::Object(input.clone()));
    if !report.is_valid() {
        return Err(AppError::ValidationFailed(report.errors));
    }

    let expected = state.model.feature_names();
    let frame = prepare_features(&input, expected.as_deref());

    let outcome = state.model.predict(&frame)?;

    let model_version = state.model.model_version();
    let input_snapshot = serde_json::Value::Object(input);
    let prediction_id = PredictionRecord::insert(
        &state.pool,
        request.employee_id,
        &input_snapshot,
        &outcome,
        &model_version,
    )
    .await?;

    Ok(PredictResponse::from_outcome(
        outcome,
        request.employee_id,
        prediction_id,
    ))
}
