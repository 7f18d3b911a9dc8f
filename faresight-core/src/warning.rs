use crate::trip::CategoryGroup;
use serde::{Deserialize, Serialize};

/// Which tier of the route table produced a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    Exact,
    Reversed,
    GlobalMean,
    Default,
    /// Taken from a caller-supplied arrival time.
    Explicit,
}

impl DurationSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DurationSource::GlobalMean | DurationSource::Default)
    }
}

/// Soft signals raised while building features. None of these stop a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureWarning {
    /// No training column for the value; the row encodes the reference category instead.
    UnknownCategory {
        group: CategoryGroup,
        value: String,
        suggestion: Option<String>,
    },
    /// An encoded column the predictor was never trained with.
    ColumnNotInSchema { predictor: String, column: String },
    RouteFallback {
        origin: String,
        destination: String,
        source: DurationSource,
    },
}
