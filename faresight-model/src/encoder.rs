use faresight_catalog::{CategoryMatch, ColumnId, FeatureVocabulary};
use faresight_core::{CategoryGroup, FeatureWarning, TripQuery};

/// One-hot columns switched on for a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedCategories {
    pub active: Vec<ColumnId>,
    pub warnings: Vec<FeatureWarning>,
}

/// Maps raw categorical selections to trained one-hot columns.
///
/// Reference and unknown values both encode as "no column": the row then
/// represents the reference category. Unknown values are reported as
/// [`FeatureWarning::UnknownCategory`] so the substitution is visible.
pub struct CategoricalEncoder<'a> {
    vocabulary: &'a FeatureVocabulary,
}

impl<'a> CategoricalEncoder<'a> {
    pub fn new(vocabulary: &'a FeatureVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn encode(&self, group: CategoryGroup, value: &str) -> Option<&'a ColumnId> {
        self.vocabulary.lookup(group, value)
    }

    pub fn encode_query(&self, query: &TripQuery) -> EncodedCategories {
        let mut encoded = EncodedCategories::default();

        for group in CategoryGroup::ALL {
            let value = query.category(group);
            match self.vocabulary.classify(group, value) {
                CategoryMatch::Column(column) => encoded.active.push(column.clone()),
                CategoryMatch::Reference => {
                    tracing::debug!("{} '{}' is the reference category", group, value);
                }
                CategoryMatch::Unknown => {
                    let suggestion = self.vocabulary.suggest(group, value).map(str::to_string);
                    tracing::warn!(
                        "Unknown {} '{}', encoding as reference category (did you mean {:?}?)",
                        group,
                        value,
                        suggestion
                    );
                    encoded.warnings.push(FeatureWarning::UnknownCategory {
                        group,
                        value: value.to_string(),
                        suggestion,
                    });
                }
            }
        }

        encoded
    }
}
