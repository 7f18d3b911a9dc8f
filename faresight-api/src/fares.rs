use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use faresight_catalog::ResolvedDuration;
use faresight_core::{FeatureWarning, TripQuery};
use faresight_model::{FeatureRow, NumericFeatures, PriceComparison};
use faresight_store::TripOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{AppError, AppJson};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub ticket_class: String,
    pub departure_date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`
    pub departure_time: String,
    pub arrival: Option<NaiveDateTime>,
    /// Restrict to one predictor; all of them when absent.
    pub predictor: Option<String>,
}

impl EstimateRequest {
    pub fn to_query(&self) -> Result<TripQuery, AppError> {
        Ok(TripQuery {
            airline: self.airline.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            ticket_class: self.ticket_class.clone(),
            departure_date: self.departure_date,
            departure_time: parse_departure_time(&self.departure_time)?,
            arrival: self.arrival,
        })
    }
}

pub fn parse_departure_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid departure_time '{}', expected HH:MM", raw)))
}

#[derive(Debug, Serialize)]
pub struct PredictionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub request_id: Uuid,
    pub duration: ResolvedDuration,
    pub features: NumericFeatures,
    pub predictions: BTreeMap<String, PredictionOutcome>,
    pub comparison: Option<PriceComparison>,
    pub warnings: Vec<FeatureWarning>,
}

#[derive(Debug, Serialize)]
pub struct PredictorRow {
    pub predictor: String,
    pub row: FeatureRow,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub request_id: Uuid,
    pub duration: ResolvedDuration,
    pub features: NumericFeatures,
    pub rows: Vec<PredictorRow>,
    pub warnings: Vec<FeatureWarning>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub predictors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionsParams {
    pub origin: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/fares/options", get(options))
        .route("/v1/fares/estimate", post(estimate))
        .route("/v1/fares/features", post(features))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        predictors: state
            .estimator
            .facade()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// GET /v1/fares/options
/// Destinations exclude the chosen origin
async fn options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> Json<TripOptions> {
    match params.origin.as_deref() {
        Some(origin) => Json(state.options.for_origin(origin)),
        None => Json(state.options.as_ref().clone()),
    }
}

/// POST /v1/fares/estimate
async fn estimate(
    State(state): State<AppState>,
    AppJson(req): AppJson<EstimateRequest>,
) -> Result<Json<EstimateResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let query = req.to_query()?;
    tracing::debug!("[{}] Estimate request {:?}", request_id, query);

    let estimate = state
        .estimator
        .estimate(&query, req.predictor.as_deref())
        .inspect_err(|e| tracing::warn!("[{}] Estimate rejected: {}", request_id, e))?;

    let predictions = estimate
        .predictions
        .iter()
        .map(|(name, outcome)| {
            let outcome = match outcome {
                Ok(price) => PredictionOutcome {
                    price: Some(*price),
                    error: None,
                },
                Err(e) => PredictionOutcome {
                    price: None,
                    error: Some(e.to_string()),
                },
            };
            (name.to_string(), outcome)
        })
        .collect();

    tracing::info!(
        "[{}] Estimated with {} predictors, {} warnings",
        request_id,
        estimate.predictions.len(),
        estimate.warnings.len()
    );

    Ok(Json(EstimateResponse {
        request_id,
        duration: estimate.duration,
        features: estimate.features,
        predictions,
        comparison: estimate.comparison,
        warnings: estimate.warnings,
    }))
}

/// POST /v1/fares/features
/// The exact rows the predictors would receive, without running them
async fn features(
    State(state): State<AppState>,
    AppJson(req): AppJson<EstimateRequest>,
) -> Result<Json<FeaturesResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let query = req.to_query()?;

    let inspection = state.estimator.inspect(&query, req.predictor.as_deref())?;
    tracing::debug!("[{}] Built {} feature rows", request_id, inspection.inputs.len());

    Ok(Json(FeaturesResponse {
        request_id,
        duration: inspection.duration,
        features: inspection.features,
        rows: inspection
            .inputs
            .into_iter()
            .map(|input| PredictorRow {
                predictor: input.predictor,
                row: input.row,
            })
            .collect(),
        warnings: inspection.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_departure_time() {
        assert_eq!(
            parse_departure_time("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_departure_time(" 23:45:30 ").unwrap(),
            NaiveTime::from_hms_opt(23, 45, 30).unwrap()
        );
        assert!(matches!(parse_departure_time("8am"), Err(AppError::BadRequest(_))));
        assert!(parse_departure_time("24:00").is_err());
    }
}
