use faresight_model::FareEstimator;
use faresight_store::TripOptions;
use std::sync::Arc;

/// Built once at startup, before the listener binds. Handlers only read it.
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<FareEstimator>,
    pub options: Arc<TripOptions>,
}

impl AppState {
    pub fn new(estimator: FareEstimator, options: TripOptions) -> Self {
        Self {
            estimator: Arc::new(estimator),
            options: Arc::new(options),
        }
    }
}
