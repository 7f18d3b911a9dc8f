pub mod trip;
pub mod warning;

pub use trip::{CategoryGroup, TripQuery};
pub use warning::{DurationSource, FeatureWarning};

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FareError {
    #[error("Missing artifact {artifact}: {reason}")]
    MissingArtifact { artifact: String, reason: String },
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Invalid time range: arrival {arrival} is not after departure {departure}")]
    InvalidTimeRange {
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
    },
    #[error("Departure {departure} plus {minutes} minutes is outside the supported calendar")]
    DateOutOfRange {
        departure: NaiveDateTime,
        minutes: u32,
    },
    #[error("Prediction failed for {predictor}: {cause}")]
    PredictionFailed { predictor: String, cause: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FareError {
    pub fn missing_artifact(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingArtifact {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    pub fn prediction_failed(predictor: impl Into<String>, cause: impl ToString) -> Self {
        Self::PredictionFailed {
            predictor: predictor.into(),
            cause: cause.to_string(),
        }
    }
}

pub type FareResult<T> = Result<T, FareError>;
