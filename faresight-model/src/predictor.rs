use crate::aligner::FeatureRow;
use faresight_catalog::ModelSchema;
use faresight_core::{FareError, FareResult};
use std::collections::HashMap;
use std::sync::Arc;

/// A trained fare model. Implementations are pure, CPU-only functions of the row.
pub trait Predictor: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Columns the model was trained on, in training order.
    fn schema(&self) -> &Arc<ModelSchema>;

    fn predict(&self, row: &FeatureRow) -> Result<f64, PredictorError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictorError {
    #[error("row was aligned to a different schema ({got} columns, model expects {expected})")]
    SchemaMismatch { expected: usize, got: usize },

    #[error("model produced a non-finite value ({0})")]
    NonFinite(f64),

    #[error("tree {tree} has no node {node}")]
    MissingNode { tree: usize, node: usize },

    #[error("tree {tree} splits on feature {feature}, row has {len} columns")]
    MissingFeature { tree: usize, feature: usize, len: usize },
}

fn check_schema(schema: &Arc<ModelSchema>, row: &FeatureRow) -> Result<(), PredictorError> {
    if Arc::ptr_eq(schema, row.schema()) || **schema == **row.schema() {
        return Ok(());
    }
    Err(PredictorError::SchemaMismatch {
        expected: schema.len(),
        got: row.len(),
    })
}

fn check_finite(value: f64) -> Result<f64, PredictorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictorError::NonFinite(value))
    }
}

/// Ordinary least squares style model: intercept + coefficients · row.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    name: String,
    schema: Arc<ModelSchema>,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearPredictor {
    /// Coefficients keyed by column name. Schema columns without a
    /// coefficient weigh zero; coefficients for unknown columns are an error.
    pub fn new(
        name: impl Into<String>,
        schema: Arc<ModelSchema>,
        intercept: f64,
        coefficients: &HashMap<String, f64>,
    ) -> FareResult<Self> {
        let name = name.into();
        let mut weights = vec![0.0; schema.len()];

        for (column, weight) in coefficients {
            let Some(i) = schema.index_of(column) else {
                return Err(FareError::missing_artifact(
                    &name,
                    format!("coefficient for column '{}' which is not in the schema", column),
                ));
            };
            weights[i] = *weight;
        }

        let unweighted = schema.len() - coefficients.len();
        if unweighted > 0 {
            tracing::debug!("{}: {} schema columns have no coefficient", name, unweighted);
        }

        Ok(Self {
            name,
            schema,
            intercept,
            coefficients: weights,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Predictor for LinearPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    fn predict(&self, row: &FeatureRow) -> Result<f64, PredictorError> {
        check_schema(&self.schema, row)?;
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(row.values())
            .map(|(w, x)| w * x)
            .sum();
        check_finite(self.intercept + dot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// `row[feature] < threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// Regression tree with the root at index 0. Children always sit after
/// their parent, so traversal terminates.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>, feature_count: usize) -> Result<Self, String> {
        if nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= feature_count {
                    return Err(format!("node {} splits on feature {} of {}", i, feature, feature_count));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", i));
                }
                for child in [*left, *right] {
                    if child <= i || child >= nodes.len() {
                        return Err(format!("node {} points to invalid child {}", i, child));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    /// Highest column index any split reads.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    pub fn leaf_value(&self, tree: usize, values: &[f64]) -> Result<f64, PredictorError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let value = values.get(*feature).ok_or(PredictorError::MissingFeature {
                        tree,
                        feature: *feature,
                        len: values.len(),
                    })?;
                    index = if *value < *threshold { *left } else { *right };
                }
                None => return Err(PredictorError::MissingNode { tree, node: index }),
            }
        }
    }
}

/// Gradient-boosted trees: base score plus the sum of one leaf per tree.
#[derive(Debug, Clone)]
pub struct TreeEnsemblePredictor {
    name: String,
    schema: Arc<ModelSchema>,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl TreeEnsemblePredictor {
    pub fn new(
        name: impl Into<String>,
        schema: Arc<ModelSchema>,
        base_score: f64,
        trees: Vec<RegressionTree>,
    ) -> FareResult<Self> {
        let name = name.into();
        for (i, tree) in trees.iter().enumerate() {
            if let Some(feature) = tree.max_feature().filter(|f| *f >= schema.len()) {
                return Err(FareError::missing_artifact(
                    &name,
                    format!("tree {} splits on feature {} of {}", i, feature, schema.len()),
                ));
            }
        }
        Ok(Self {
            name,
            schema,
            base_score,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Predictor for TreeEnsemblePredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    fn predict(&self, row: &FeatureRow) -> Result<f64, PredictorError> {
        check_schema(&self.schema, row)?;
        let mut total = self.base_score;
        for (i, tree) in self.trees.iter().enumerate() {
            total += tree.leaf_value(i, row.values())?;
        }
        check_finite(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::align;
    use crate::features::{NumericFeatures, TemporalFeatures};
    use chrono::{NaiveDate, NaiveTime};

    fn schema(names: &[&str]) -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap())
    }

    fn row(schema: &Arc<ModelSchema>, hour: u32) -> FeatureRow {
        let temporal = TemporalFeatures::extract(
            NaiveDate::from_ymd_opt(2021, 5, 15).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            130,
        ).unwrap();
        align(&NumericFeatures::new(temporal, 0.0), &[], schema)
    }

    #[test]
    fn test_linear_prediction() {
        let schema = schema(&["hour", "duration_minutes", "month"]);
        let mut coefficients = HashMap::new();
        coefficients.insert("hour".to_string(), 10.0);
        coefficients.insert("duration_minutes".to_string(), 2.0);
        let model = LinearPredictor::new("linear", schema.clone(), 100.0, &coefficients).unwrap();

        // 100 + 10 * 8 + 2 * 130 + 0 * 5
        assert_eq!(model.predict(&row(&schema, 8)).unwrap(), 440.0);
        assert_eq!(model.coefficients(), &[10.0, 2.0, 0.0]);
    }

    #[test]
    fn test_negative_prediction_passes_through() {
        let schema = schema(&["hour"]);
        let mut coefficients = HashMap::new();
        coefficients.insert("hour".to_string(), -50.0);
        let model = LinearPredictor::new("linear", schema.clone(), 0.0, &coefficients).unwrap();
        assert_eq!(model.predict(&row(&schema, 8)).unwrap(), -400.0);
    }

    #[test]
    fn test_unknown_coefficient_column_rejected() {
        let mut coefficients = HashMap::new();
        coefficients.insert("weather".to_string(), 1.0);
        let err = LinearPredictor::new("linear", schema(&["hour"]), 0.0, &coefficients).unwrap_err();
        assert!(matches!(err, FareError::MissingArtifact { ref artifact, .. } if artifact == "linear"));
    }

    #[test]
    fn test_schema_mismatch_is_an_error() {
        let trained = schema(&["hour", "month"]);
        let other = schema(&["month", "hour"]);
        let model = LinearPredictor::new("linear", trained, 0.0, &HashMap::new()).unwrap();
        assert_eq!(
            model.predict(&row(&other, 8)),
            Err(PredictorError::SchemaMismatch { expected: 2, got: 2 })
        );

        // Equal column lists behind different Arcs are accepted
        let same = schema(&["hour", "month"]);
        assert!(model.predict(&row(&same, 8)).is_ok());
    }

    #[test]
    fn test_non_finite_output_is_an_error() {
        let schema = schema(&["hour"]);
        let model = LinearPredictor::new("linear", schema.clone(), f64::INFINITY, &HashMap::new()).unwrap();
        assert!(matches!(model.predict(&row(&schema, 8)), Err(PredictorError::NonFinite(_))));
    }

    #[test]
    fn test_tree_ensemble_prediction() {
        let schema = schema(&["hour", "duration_minutes"]);
        let stump = RegressionTree::new(
            vec![
                TreeNode::Split { feature: 0, threshold: 12.0, left: 1, right: 2 },
                TreeNode::Leaf { value: 500.0 },
                TreeNode::Leaf { value: 800.0 },
            ],
            schema.len(),
        )
        .unwrap();
        let long_haul = RegressionTree::new(
            vec![
                TreeNode::Split { feature: 1, threshold: 120.0, left: 1, right: 2 },
                TreeNode::Leaf { value: -20.0 },
                TreeNode::Leaf { value: 60.0 },
            ],
            schema.len(),
        )
        .unwrap();
        let model = TreeEnsemblePredictor::new("xgboost", schema.clone(), 1000.0, vec![stump, long_haul]).unwrap();

        assert_eq!(model.predict(&row(&schema, 8)).unwrap(), 1560.0);
        assert_eq!(model.predict(&row(&schema, 12)).unwrap(), 1860.0);
    }

    #[test]
    fn test_malformed_trees_rejected() {
        let loop_back = vec![
            TreeNode::Split { feature: 0, threshold: 1.0, left: 0, right: 1 },
            TreeNode::Leaf { value: 1.0 },
        ];
        assert!(RegressionTree::new(loop_back, 1).is_err());

        let bad_feature = vec![
            TreeNode::Split { feature: 3, threshold: 1.0, left: 1, right: 2 },
            TreeNode::Leaf { value: 1.0 },
            TreeNode::Leaf { value: 2.0 },
        ];
        assert!(RegressionTree::new(bad_feature, 1).is_err());
        assert!(RegressionTree::new(Vec::new(), 1).is_err());
    }

    #[test]
    fn test_tree_wider_than_schema_rejected() {
        let narrow = schema(&["hour"]);
        let wide_tree = RegressionTree::new(
            vec![
                TreeNode::Split { feature: 4, threshold: 1.0, left: 1, right: 2 },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
            ],
            5,
        )
        .unwrap();
        assert_eq!(wide_tree.max_feature(), Some(4));

        let err = TreeEnsemblePredictor::new("xgboost", narrow.clone(), 0.0, vec![wide_tree.clone()]).unwrap_err();
        assert!(matches!(err, FareError::MissingArtifact { ref reason, .. } if reason.contains("feature 4")));

        // Evaluated directly against a short row, the tree reports instead of panicking
        assert_eq!(
            wide_tree.leaf_value(0, &[8.0]),
            Err(PredictorError::MissingFeature { tree: 0, feature: 4, len: 1 })
        );
    }
}
