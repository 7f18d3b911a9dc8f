use crate::aligner::{align, unrecognized, FeatureRow};
use crate::encoder::CategoricalEncoder;
use crate::features::{validate_time_range, NumericFeatures, TemporalFeatures};
use crate::inference::{run_predictors, InferenceFacade, PredictionSet, PriceComparison};
use crate::predictor::Predictor;
use faresight_catalog::{ColumnId, FeatureVocabulary, ModelSchema, ReferenceTables, ResolvedDuration};
use faresight_core::{DurationSource, FareResult, FeatureWarning, TripQuery};
use std::sync::Arc;

/// Schema-independent features for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDraft {
    pub numeric: NumericFeatures,
    pub duration: ResolvedDuration,
    pub active: Vec<ColumnId>,
    pub warnings: Vec<FeatureWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FareEstimate {
    pub duration: ResolvedDuration,
    pub features: NumericFeatures,
    pub predictions: PredictionSet,
    pub comparison: Option<PriceComparison>,
    pub warnings: Vec<FeatureWarning>,
}

/// Row built for one predictor, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorInput {
    pub predictor: String,
    pub row: FeatureRow,
}

/// Everything `estimate` would feed the predictors, without running them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInspection {
    pub duration: ResolvedDuration,
    pub features: NumericFeatures,
    pub inputs: Vec<PredictorInput>,
    pub warnings: Vec<FeatureWarning>,
}

/// Turns trip queries into aligned rows and prices.
///
/// Holds only read-only state, so one instance can be shared across threads.
#[derive(Debug)]
pub struct FareEstimator {
    tables: ReferenceTables,
    vocabulary: FeatureVocabulary,
    facade: InferenceFacade,
}

impl FareEstimator {
    pub fn new(tables: ReferenceTables, vocabulary: FeatureVocabulary, facade: InferenceFacade) -> Self {
        Self {
            tables,
            vocabulary,
            facade,
        }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn vocabulary(&self) -> &FeatureVocabulary {
        &self.vocabulary
    }

    pub fn facade(&self) -> &InferenceFacade {
        &self.facade
    }

    /// Derive every feature that does not depend on a particular schema.
    pub fn prepare(&self, query: &TripQuery) -> FareResult<FeatureDraft> {
        let mut warnings = Vec::new();

        // 1. Duration: explicit arrival first, route table otherwise
        let duration = match query.arrival {
            Some(arrival) => ResolvedDuration {
                minutes: validate_time_range(query.departure(), arrival)?,
                source: DurationSource::Explicit,
            },
            None => {
                let resolved = self
                    .tables
                    .durations
                    .resolve_detailed(&query.origin, &query.destination);
                if resolved.source.is_fallback() {
                    warnings.push(FeatureWarning::RouteFallback {
                        origin: query.origin.clone(),
                        destination: query.destination.clone(),
                        source: resolved.source,
                    });
                }
                resolved
            }
        };

        // 2. Numeric features
        let temporal =
            TemporalFeatures::extract(query.departure_date, query.departure_time, duration.minutes)?;
        let fee = self.tables.fees.estimate(&query.airline);
        let numeric = NumericFeatures::new(temporal, fee);

        // 3. Categorical columns
        let encoded = CategoricalEncoder::new(&self.vocabulary).encode_query(query);
        warnings.extend(encoded.warnings);

        Ok(FeatureDraft {
            numeric,
            duration,
            active: encoded.active,
            warnings,
        })
    }

    pub fn build_row(&self, query: &TripQuery, schema: &Arc<ModelSchema>) -> FareResult<FeatureRow> {
        let draft = self.prepare(query)?;
        Ok(align(&draft.numeric, &draft.active, schema))
    }

    /// Aligned rows and warnings for the selected predictors, without running them.
    pub fn inspect(&self, query: &TripQuery, predictor: Option<&str>) -> FareResult<FeatureInspection> {
        let selected = self.facade.select(predictor)?;
        let draft = self.prepare(query)?;
        let warnings = schema_warnings(&draft, &selected);
        let mut rows = RowCache::default();

        let inputs = selected
            .iter()
            .map(|p| PredictorInput {
                predictor: p.name().to_string(),
                row: rows.row_for(&draft, p.schema()).clone(),
            })
            .collect();

        Ok(FeatureInspection {
            duration: draft.duration,
            features: draft.numeric,
            inputs,
            warnings,
        })
    }

    /// Price a query with every registered predictor, or only the named one.
    pub fn estimate(&self, query: &TripQuery, predictor: Option<&str>) -> FareResult<FareEstimate> {
        // Unknown predictors fail before any feature work
        let selected = self.facade.select(predictor)?;
        let draft = self.prepare(query)?;

        let warnings = schema_warnings(&draft, &selected);
        let mut predictions = PredictionSet::default();
        let mut rows = RowCache::default();

        for p in &selected {
            let row = rows.row_for(&draft, p.schema());
            predictions.extend(run_predictors(row, [*p]));
        }

        let comparison = compare_pair(&selected, &predictions);

        tracing::info!(
            "Estimated {} -> {} ({}, {}): {:?}",
            query.origin,
            query.destination,
            query.airline,
            query.ticket_class,
            predictions.prices()
        );

        Ok(FareEstimate {
            duration: draft.duration,
            features: draft.numeric,
            predictions,
            comparison,
            warnings,
        })
    }
}

/// Draft warnings plus one entry per active column a selected schema lacks.
fn schema_warnings(draft: &FeatureDraft, selected: &[&Arc<dyn Predictor>]) -> Vec<FeatureWarning> {
    let mut warnings = draft.warnings.clone();
    for p in selected {
        warnings.extend(unrecognized(&draft.active, p.schema()).into_iter().map(|column| {
            FeatureWarning::ColumnNotInSchema {
                predictor: p.name().to_string(),
                column: column.to_string(),
            }
        }));
    }
    warnings
}

fn compare_pair(selected: &[&Arc<dyn Predictor>], predictions: &PredictionSet) -> Option<PriceComparison> {
    match selected {
        [first, second] => predictions.compare(first.name(), second.name()),
        _ => None,
    }
}

/// Aligns a draft once per distinct schema.
#[derive(Default)]
struct RowCache {
    rows: Vec<FeatureRow>,
}

impl RowCache {
    fn row_for(&mut self, draft: &FeatureDraft, schema: &Arc<ModelSchema>) -> &FeatureRow {
        let position = self
            .rows
            .iter()
            .position(|row| Arc::ptr_eq(row.schema(), schema) || **row.schema() == **schema);
        let index = match position {
            Some(index) => index,
            None => {
                self.rows.push(align(&draft.numeric, &draft.active, schema));
                self.rows.len() - 1
            }
        };
        &self.rows[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{LinearPredictor, PredictorError};
    use chrono::{NaiveDate, NaiveTime};
    use faresight_catalog::{DurationTable, FeeTable, RouteEntry, VocabularyConfig};
    use faresight_core::{CategoryGroup, FareError};
    use std::collections::HashMap;

    const AIRLINES: [&str; 4] = [
        "airline_Pacific Airlines",
        "airline_Vietjet",
        "airline_Vietnam Airlines",
        "airline_Vietravel Airlines",
    ];

    fn schema(extra: &[&str]) -> Arc<ModelSchema> {
        let mut columns: Vec<String> = [
            "hour",
            "day_of_week",
            "day",
            "month",
            "duration_minutes",
            "baseline_fee",
            "from_Hà Nội",
            "from_TP HCM",
            "to_Hà Nội",
            "to_TP HCM",
            "type_Thương gia",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        columns.extend(AIRLINES.iter().map(|s| s.to_string()));
        columns.extend(extra.iter().map(|s| s.to_string()));
        Arc::new(ModelSchema::new(columns).unwrap())
    }

    fn linear(name: &str, schema: &Arc<ModelSchema>) -> Arc<dyn Predictor> {
        let mut coefficients = HashMap::new();
        coefficients.insert("duration_minutes".to_string(), 10_000.0);
        coefficients.insert("type_Thương gia".to_string(), 2_000_000.0);
        coefficients.insert("airline_Vietnam Airlines".to_string(), 300_000.0);
        Arc::new(LinearPredictor::new(name, schema.clone(), 500_000.0, &coefficients).unwrap())
    }

    fn estimator(predictors: Vec<Arc<dyn Predictor>>) -> FareEstimator {
        let durations = DurationTable::from_entries(
            vec![RouteEntry {
                origin: "Hà Nội".to_string(),
                destination: "TP HCM".to_string(),
                minutes: 130,
            }],
            120,
        );
        let mut fees = HashMap::new();
        fees.insert("Vietjet".to_string(), 150_000.0);
        let tables = ReferenceTables::new(durations, FeeTable::new(fees, 200_000.0).unwrap());

        let mut config = VocabularyConfig::default();
        config.reference_categories.airline = Some("Bamboo Airways".to_string());
        config.reference_categories.ticket_class = Some("Phổ thông".to_string());
        let vocabulary =
            FeatureVocabulary::from_schemas(predictors.iter().map(|p| p.schema().as_ref()), &config);

        FareEstimator::new(tables, vocabulary, InferenceFacade::new(predictors).unwrap())
    }

    fn query(airline: &str) -> TripQuery {
        TripQuery {
            airline: airline.to_string(),
            origin: "Hà Nội".to_string(),
            destination: "TP HCM".to_string(),
            ticket_class: "Thương gia".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2021, 5, 15).unwrap(),
            departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            arrival: None,
        }
    }

    #[test]
    fn test_hanoi_to_saigon_row() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);

        let row = estimator.build_row(&query("Vietjet"), &schema).unwrap();
        assert_eq!(row.get("hour"), Some(8.0));
        assert_eq!(row.get("day_of_week"), Some(5.0));
        assert_eq!(row.get("day"), Some(15.0));
        assert_eq!(row.get("month"), Some(5.0));
        assert_eq!(row.get("duration_minutes"), Some(130.0));
        assert_eq!(row.get("baseline_fee"), Some(150_000.0));
        assert_eq!(row.get("airline_Vietjet"), Some(1.0));
        assert_eq!(row.get("from_Hà Nội"), Some(1.0));
        assert_eq!(row.get("to_TP HCM"), Some(1.0));
        assert_eq!(row.get("to_Hà Nội"), Some(0.0));
        assert_eq!(row.get("type_Thương gia"), Some(1.0));
        assert_eq!(row.values().iter().sum::<f64>(), 8.0 + 5.0 + 15.0 + 5.0 + 130.0 + 150_000.0 + 4.0);
    }

    #[test]
    fn test_estimate_reports_arrival_and_price() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);

        let estimate = estimator.estimate(&query("Vietnam Airlines"), None).unwrap();
        assert_eq!(estimate.duration.minutes, 130);
        assert_eq!(estimate.duration.source, DurationSource::Exact);
        assert_eq!(
            estimate.features.temporal.arrival,
            NaiveDate::from_ymd_opt(2021, 5, 15).unwrap().and_hms_opt(10, 10, 0).unwrap()
        );
        // 500k + 130 * 10k + 2M + 300k
        assert_eq!(estimate.predictions.price("linear_regression"), Some(4_100_000.0));
        assert!(estimate.comparison.is_none());
        assert!(estimate.warnings.is_empty());
    }

    #[test]
    fn test_bamboo_airways_row_equals_any_unlisted_airline() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);

        let bamboo = estimator.build_row(&query("Bamboo Airways"), &schema).unwrap();
        let unknown = estimator.build_row(&query("Air Mekong"), &schema).unwrap();

        for column in AIRLINES {
            assert_eq!(bamboo.get(column), Some(0.0));
        }
        assert_eq!(bamboo, unknown);

        let warnings = estimator.prepare(&query("Air Mekong")).unwrap().warnings;
        assert!(matches!(
            warnings.as_slice(),
            [FeatureWarning::UnknownCategory { group: CategoryGroup::Airline, .. }]
        ));
        assert!(estimator.prepare(&query("Bamboo Airways")).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_explicit_arrival() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);
        let day = NaiveDate::from_ymd_opt(2021, 5, 15).unwrap();

        let mut early = query("Vietjet");
        early.arrival = day.and_hms_opt(8, 0, 0);
        assert!(matches!(
            estimator.estimate(&early, None),
            Err(FareError::InvalidTimeRange { .. })
        ));

        let mut late = query("Vietjet");
        late.arrival = day.and_hms_opt(10, 25, 0);
        let estimate = estimator.estimate(&late, None).unwrap();
        assert_eq!(estimate.duration.minutes, 145);
        assert_eq!(estimate.duration.source, DurationSource::Explicit);
    }

    #[test]
    fn test_unknown_route_falls_back_with_warning() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);
        let mut same_city = query("Vietjet");
        same_city.destination = same_city.origin.clone();

        let draft = estimator.prepare(&same_city).unwrap();
        assert_eq!(draft.duration.minutes, 130); // only route known, so it is the mean
        assert!(draft.warnings.iter().any(|w| matches!(
            w,
            FeatureWarning::RouteFallback { source: DurationSource::GlobalMean, .. }
        )));
    }

    #[test]
    fn test_two_predictors_are_compared() {
        let wide = schema(&["airline_Bamboo Airways"]);
        let narrow = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &narrow), linear("xgboost", &wide)]);

        let estimate = estimator.estimate(&query("Bamboo Airways"), None).unwrap();
        let comparison = estimate.comparison.unwrap();
        assert_eq!(comparison.first, "linear_regression");
        assert_eq!(comparison.absolute_difference, 0.0);

        // The wide schema knows Bamboo Airways, the narrow one does not
        assert!(estimate.warnings.contains(&FeatureWarning::ColumnNotInSchema {
            predictor: "linear_regression".to_string(),
            column: "airline_Bamboo Airways".to_string(),
        }));

        let inspection = estimator.inspect(&query("Bamboo Airways"), None).unwrap();
        assert_eq!(inspection.inputs[0].row.len(), narrow.len());
        assert_eq!(inspection.inputs[1].row.get("airline_Bamboo Airways"), Some(1.0));
        // Same warnings as the priced request, computed from one draft
        assert_eq!(inspection.warnings, estimate.warnings);
        assert_eq!(inspection.duration, estimate.duration);
    }

    #[test]
    fn test_unknown_predictor_fails_before_features() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);

        // Invalid arrival would also fail; the missing predictor is reported first
        let mut query = query("Vietjet");
        query.arrival = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        assert!(matches!(
            estimator.estimate(&query, Some("xgboost")),
            Err(FareError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_failed_predictor_does_not_abort_request() {
        #[derive(Debug)]
        struct Broken(Arc<ModelSchema>);

        impl Predictor for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn schema(&self) -> &Arc<ModelSchema> {
                &self.0
            }
            fn predict(&self, _row: &FeatureRow) -> Result<f64, PredictorError> {
                Err(PredictorError::NonFinite(f64::INFINITY))
            }
        }

        let schema = schema(&[]);
        let estimator = estimator(vec![
            linear("linear_regression", &schema),
            Arc::new(Broken(schema.clone())),
        ]);

        let estimate = estimator.estimate(&query("Vietjet"), None).unwrap();
        assert!(estimate.predictions.price("linear_regression").is_some());
        assert!(estimate.predictions.get("broken").unwrap().is_err());
        assert!(estimate.comparison.is_none());
    }

    #[test]
    fn test_rows_are_deterministic() {
        let schema = schema(&[]);
        let estimator = estimator(vec![linear("linear_regression", &schema)]);

        let first = estimator.build_row(&query("Vietjet"), &schema).unwrap();
        let second = estimator.build_row(&query("Vietjet"), &schema).unwrap();
        let bits = |row: &FeatureRow| row.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }
}
