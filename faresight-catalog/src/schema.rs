use faresight_core::{FareError, FareResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered column list a trained predictor consumes.
///
/// Construction rejects empty and duplicated column lists, so every
/// instance is a valid training-time layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ModelSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl ModelSchema {
    pub fn new(columns: Vec<String>) -> FareResult<Self> {
        if columns.is_empty() {
            return Err(FareError::InvalidSchema("schema has no columns".to_string()));
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if column.is_empty() {
                return Err(FareError::InvalidSchema(format!(
                    "column {} has an empty name",
                    position
                )));
            }
            if let Some(first) = index.insert(column.clone(), position) {
                return Err(FareError::InvalidSchema(format!(
                    "column '{}' appears at positions {} and {}",
                    column, first, position
                )));
            }
        }

        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }
}

impl TryFrom<Vec<String>> for ModelSchema {
    type Error = FareError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<ModelSchema> for Vec<String> {
    fn from(schema: ModelSchema) -> Self {
        schema.columns
    }
}
