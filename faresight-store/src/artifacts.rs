use faresight_catalog::ModelSchema;
use faresight_core::{FareError, FareResult};
use faresight_model::{LinearPredictor, Predictor, RegressionTree, TreeEnsemblePredictor, TreeNode};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Exported model: the training column order plus the fitted parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear {
        name: String,
        columns: Vec<String>,
        intercept: f64,
        coefficients: HashMap<String, f64>,
    },
    TreeEnsemble {
        name: String,
        columns: Vec<String>,
        #[serde(default)]
        base_score: f64,
        trees: Vec<TreeArtifact>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<NodeArtifact>,
}

/// Split features are referenced by column name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeArtifact {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

impl ModelArtifact {
    pub fn name(&self) -> &str {
        match self {
            ModelArtifact::Linear { name, .. } | ModelArtifact::TreeEnsemble { name, .. } => name,
        }
    }

    pub fn into_predictor(self) -> FareResult<Arc<dyn Predictor>> {
        match self {
            ModelArtifact::Linear {
                name,
                columns,
                intercept,
                coefficients,
            } => {
                let schema = schema_for(&name, columns)?;
                let predictor = LinearPredictor::new(name, schema, intercept, &coefficients)?;
                Ok(Arc::new(predictor))
            }
            ModelArtifact::TreeEnsemble {
                name,
                columns,
                base_score,
                trees,
            } => {
                let schema = schema_for(&name, columns)?;
                let trees = trees
                    .into_iter()
                    .enumerate()
                    .map(|(i, tree)| build_tree(&schema, tree).map_err(|reason| {
                        FareError::missing_artifact(&name, format!("tree {}: {}", i, reason))
                    }))
                    .collect::<FareResult<Vec<_>>>()?;
                Ok(Arc::new(TreeEnsemblePredictor::new(name, schema, base_score, trees)?))
            }
        }
    }
}

fn schema_for(name: &str, columns: Vec<String>) -> FareResult<Arc<ModelSchema>> {
    ModelSchema::new(columns).map(Arc::new).map_err(|e| match e {
        FareError::InvalidSchema(reason) => FareError::InvalidSchema(format!("{}: {}", name, reason)),
        other => other,
    })
}

fn build_tree(schema: &ModelSchema, tree: TreeArtifact) -> Result<RegressionTree, String> {
    let nodes = tree
        .nodes
        .into_iter()
        .map(|node| match node {
            NodeArtifact::Leaf { leaf } => Ok(TreeNode::Leaf { value: leaf }),
            NodeArtifact::Split {
                feature,
                threshold,
                left,
                right,
            } => schema
                .index_of(&feature)
                .map(|feature| TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                })
                .ok_or_else(|| format!("split on unknown column '{}'", feature)),
        })
        .collect::<Result<Vec<_>, String>>()?;
    RegressionTree::new(nodes, schema.len())
}

/// Load one predictor from a JSON artifact file.
pub fn load_predictor(path: impl AsRef<Path>) -> FareResult<Arc<dyn Predictor>> {
    let path = path.as_ref();
    let artifact = path.display().to_string();

    let raw = std::fs::read_to_string(path)
        .map_err(|e| FareError::missing_artifact(&artifact, e.to_string()))?;
    let model: ModelArtifact = serde_json::from_str(&raw)
        .map_err(|e| FareError::missing_artifact(&artifact, e.to_string()))?;

    tracing::info!("Loaded model {} from {}", model.name(), artifact);
    model.into_predictor()
}

/// Load every configured predictor; any failure is fatal.
pub fn load_predictors<P: AsRef<Path>>(paths: &[P]) -> FareResult<Vec<Arc<dyn Predictor>>> {
    if paths.is_empty() {
        return Err(FareError::missing_artifact("artifacts.models", "no model artifacts configured"));
    }
    paths.iter().map(load_predictor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LINEAR: &str = r#"{
        "kind": "linear",
        "name": "linear_regression",
        "columns": ["hour", "duration_minutes", "airline_Vietjet"],
        "intercept": 500000.0,
        "coefficients": { "duration_minutes": 10000.0, "airline_Vietjet": -200000.0 }
    }"#;

    const BOOSTED: &str = r#"{
        "kind": "tree_ensemble",
        "name": "xgboost",
        "columns": ["hour", "duration_minutes"],
        "base_score": 1000000.0,
        "trees": [
            { "nodes": [
                { "feature": "duration_minutes", "threshold": 120.0, "left": 1, "right": 2 },
                { "leaf": 100000.0 },
                { "leaf": 400000.0 }
            ] }
        ]
    }"#;

    #[test]
    fn test_parse_both_kinds() {
        let linear: ModelArtifact = serde_json::from_str(LINEAR).unwrap();
        assert_eq!(linear.name(), "linear_regression");
        let predictor = linear.into_predictor().unwrap();
        assert_eq!(predictor.schema().len(), 3);

        let boosted: ModelArtifact = serde_json::from_str(BOOSTED).unwrap();
        let predictor = boosted.into_predictor().unwrap();
        assert_eq!(predictor.name(), "xgboost");
    }

    #[test]
    fn test_split_on_unknown_column_rejected() {
        let broken = BOOSTED.replace("\"feature\": \"duration_minutes\"", "\"feature\": \"weather\"");
        let artifact: ModelArtifact = serde_json::from_str(&broken).unwrap();
        let err = artifact.into_predictor().unwrap_err();
        assert!(matches!(err, FareError::MissingArtifact { ref reason, .. } if reason.contains("weather")));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let broken = LINEAR.replace("\"airline_Vietjet\"]", "\"hour\"]");
        let artifact: ModelArtifact = serde_json::from_str(&broken).unwrap();
        assert!(matches!(
            artifact.into_predictor(),
            Err(FareError::InvalidSchema(ref reason)) if reason.starts_with("linear_regression")
        ));
    }

    #[test]
    fn test_missing_file_is_missing_artifact() {
        let err = load_predictor("/nonexistent/faresight/model.json").unwrap_err();
        assert!(matches!(err, FareError::MissingArtifact { ref artifact, .. } if artifact.ends_with("model.json")));

        let none: [&str; 0] = [];
        assert!(load_predictors(&none).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("faresight-artifacts-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let linear = dir.join("linear.json");
        let boosted = dir.join("boosted.json");
        fs::write(&linear, LINEAR).unwrap();
        fs::write(&boosted, BOOSTED).unwrap();

        let predictors = load_predictors(&[linear, boosted]).unwrap();
        let names: Vec<_> = predictors.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["linear_regression", "xgboost"]);

        fs::remove_dir_all(&dir).ok();
    }
}
