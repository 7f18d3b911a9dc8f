pub mod app_config;
pub mod artifacts;
pub mod history;

pub use app_config::Config;
pub use artifacts::{load_predictor, load_predictors, ModelArtifact};
pub use history::{FlightHistory, HistoricalFlight, TripOptions};

use faresight_catalog::{DurationTable, FeatureVocabulary, FeeTable, ReferenceTables};
use faresight_core::FareResult;
use faresight_model::{FareEstimator, InferenceFacade};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Build the shared estimator from configuration.
///
/// Model artifacts are required. The history CSV is optional: when it cannot
/// be read the static routes and defaults are used and the selectable options
/// come from the model vocabulary instead.
pub fn build_estimator(config: &Config) -> FareResult<(FareEstimator, TripOptions)> {
    let predictors = load_predictors(&config.artifacts.models)?;

    let reference = &config.reference;
    let history = match reference.history_csv.as_deref() {
        Some(path) => match FlightHistory::load(path) {
            Ok(history) => Some(history),
            Err(e) => {
                tracing::warn!("Flight history {} unavailable, using static routes: {}", path, e);
                None
            }
        },
        None => None,
    };

    let durations = match &history {
        Some(history) => history.duration_table(reference.default_duration_minutes),
        None => DurationTable::new(reference.default_duration_minutes),
    }
    .with_entries(reference.routes.iter().cloned());
    let fees = FeeTable::new(reference.fee_map(), reference.default_fee)?;

    let vocabulary = FeatureVocabulary::from_schemas(
        predictors.iter().map(|p| p.schema().as_ref()),
        &config.vocabulary,
    );
    let options = match &history {
        Some(history) if !history.is_empty() => history.options(),
        _ => TripOptions::from_vocabulary(&vocabulary),
    };

    let facade = InferenceFacade::new(predictors)?;
    tracing::info!(
        "Estimator ready: predictors {:?}, {} routes, {} fee entries",
        facade.names(),
        durations.len(),
        reference.fees.len()
    );

    let tables = ReferenceTables::new(durations, fees);
    Ok((FareEstimator::new(tables, vocabulary, facade), options))
}
