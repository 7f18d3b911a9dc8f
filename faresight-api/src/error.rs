use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faresight_core::FareError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Fare(#[from] FareError),
}

/// `Json` extractor whose rejections use the API's error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Fare(err @ FareError::DateOutOfRange { .. }) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Fare(err @ FareError::InvalidTimeRange { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            // Only raised at request time for an unregistered predictor name
            AppError::Fare(err @ FareError::MissingArtifact { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            AppError::Fare(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
