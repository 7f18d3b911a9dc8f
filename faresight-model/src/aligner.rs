use crate::features::NumericFeatures;
use faresight_catalog::{ColumnId, ModelSchema};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// Feature vector laid out exactly as one schema expects.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    schema: Arc<ModelSchema>,
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.index_of(column).map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Conform numeric features and active one-hot columns to `schema`.
///
/// Every schema column starts at zero. Numeric and one-hot columns the schema
/// does not declare are dropped, so the row always has exactly the schema's
/// columns in the schema's order.
pub fn align(numeric: &NumericFeatures, active: &[ColumnId], schema: &Arc<ModelSchema>) -> FeatureRow {
    let mut values = vec![0.0; schema.len()];

    for (column, value) in numeric.columns() {
        if let Some(i) = schema.index_of(column) {
            values[i] = value;
        }
    }

    for column in active {
        match schema.index_of(column.as_str()) {
            Some(i) => values[i] = 1.0,
            None => tracing::debug!("Schema has no column {}, ignoring", column),
        }
    }

    FeatureRow {
        schema: Arc::clone(schema),
        values,
    }
}

/// Active columns `schema` does not know about.
pub fn unrecognized<'c>(active: &'c [ColumnId], schema: &ModelSchema) -> Vec<&'c ColumnId> {
    active
        .iter()
        .filter(|column| !schema.contains(column.as_str()))
        .collect()
}
