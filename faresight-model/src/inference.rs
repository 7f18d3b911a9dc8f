use crate::aligner::FeatureRow;
use crate::predictor::Predictor;
use faresight_core::{FareError, FareResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Two predictors' prices side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceComparison {
    pub first: String,
    pub first_price: f64,
    pub second: String,
    pub second_price: f64,
    pub absolute_difference: f64,
}

/// Per-predictor results of one request. Failures stay next to successes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionSet {
    outcomes: BTreeMap<String, FareResult<f64>>,
}

impl PredictionSet {
    pub fn insert(&mut self, predictor: impl Into<String>, outcome: FareResult<f64>) {
        self.outcomes.insert(predictor.into(), outcome);
    }

    pub fn extend(&mut self, other: PredictionSet) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn get(&self, predictor: &str) -> Option<&FareResult<f64>> {
        self.outcomes.get(predictor)
    }

    pub fn price(&self, predictor: &str) -> Option<f64> {
        self.outcomes.get(predictor)?.as_ref().ok().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FareResult<f64>)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn prices(&self) -> BTreeMap<&str, f64> {
        self.iter()
            .filter_map(|(name, outcome)| outcome.as_ref().ok().map(|price| (name, *price)))
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FareError> {
        self.outcomes.values().filter_map(|outcome| outcome.as_ref().err())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Both prices and their absolute difference, when both predictors succeeded.
    pub fn compare(&self, first: &str, second: &str) -> Option<PriceComparison> {
        let first_price = self.price(first)?;
        let second_price = self.price(second)?;
        Some(PriceComparison {
            first: first.to_string(),
            first_price,
            second: second.to_string(),
            second_price,
            absolute_difference: (first_price - second_price).abs(),
        })
    }
}

/// Run each predictor on the same row, isolating failures.
pub fn run_predictors<'p>(
    row: &FeatureRow,
    predictors: impl IntoIterator<Item = &'p Arc<dyn Predictor>>,
) -> PredictionSet {
    let mut set = PredictionSet::default();
    for predictor in predictors {
        let outcome = predictor.predict(row).map_err(|e| {
            tracing::error!("Predictor {} failed: {}", predictor.name(), e);
            FareError::prediction_failed(predictor.name(), e)
        });
        if let Ok(price) = outcome {
            if price < 0.0 {
                tracing::warn!("Predictor {} returned a negative price {}", predictor.name(), price);
            }
        }
        set.insert(predictor.name(), outcome);
    }
    set
}

/// The registered predictors, each behind the same `predict(row)` contract.
#[derive(Debug, Clone)]
pub struct InferenceFacade {
    predictors: Vec<Arc<dyn Predictor>>,
}

impl InferenceFacade {
    pub fn new(predictors: Vec<Arc<dyn Predictor>>) -> FareResult<Self> {
        if predictors.is_empty() {
            return Err(FareError::missing_artifact("predictors", "no predictor registered"));
        }
        let mut seen = HashSet::new();
        for predictor in &predictors {
            if !seen.insert(predictor.name()) {
                return Err(FareError::InvalidConfig(format!(
                    "predictor name '{}' registered twice",
                    predictor.name()
                )));
            }
        }
        Ok(Self { predictors })
    }

    pub fn predictors(&self) -> &[Arc<dyn Predictor>] {
        &self.predictors
    }

    pub fn names(&self) -> Vec<&str> {
        self.predictors.iter().map(|p| p.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Predictor>> {
        self.predictors.iter().find(|p| p.name() == name)
    }

    /// All predictors, or just the named one.
    pub fn select(&self, name: Option<&str>) -> FareResult<Vec<&Arc<dyn Predictor>>> {
        match name {
            None => Ok(self.predictors.iter().collect()),
            Some(name) => self
                .get(name)
                .map(|p| vec![p])
                .ok_or_else(|| FareError::missing_artifact(name, "no such predictor registered")),
        }
    }

    /// Invoke every registered predictor with the identical row.
    pub fn predict_all(&self, row: &FeatureRow) -> PredictionSet {
        run_predictors(row, &self.predictors)
    }
}
