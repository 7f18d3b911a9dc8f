use crate::schema::ModelSchema;
use faresight_core::CategoryGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One value per categorical group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerGroup<T> {
    pub airline: T,
    pub origin: T,
    pub destination: T,
    pub ticket_class: T,
}

impl<T> PerGroup<T> {
    pub fn from_fn(mut f: impl FnMut(CategoryGroup) -> T) -> Self {
        Self {
            airline: f(CategoryGroup::Airline),
            origin: f(CategoryGroup::Origin),
            destination: f(CategoryGroup::Destination),
            ticket_class: f(CategoryGroup::TicketClass),
        }
    }

    pub fn get(&self, group: CategoryGroup) -> &T {
        match group {
            CategoryGroup::Airline => &self.airline,
            CategoryGroup::Origin => &self.origin,
            CategoryGroup::Destination => &self.destination,
            CategoryGroup::TicketClass => &self.ticket_class,
        }
    }

    fn get_mut(&mut self, group: CategoryGroup) -> &mut T {
        match group {
            CategoryGroup::Airline => &mut self.airline,
            CategoryGroup::Origin => &mut self.origin,
            CategoryGroup::Destination => &mut self.destination,
            CategoryGroup::TicketClass => &mut self.ticket_class,
        }
    }
}

impl<T: Default> Default for PerGroup<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

/// Column name prefix per group. Any group left out keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPrefixes {
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub ticket_class: String,
}

impl ColumnPrefixes {
    pub fn get(&self, group: CategoryGroup) -> &str {
        match group {
            CategoryGroup::Airline => &self.airline,
            CategoryGroup::Origin => &self.origin,
            CategoryGroup::Destination => &self.destination,
            CategoryGroup::TicketClass => &self.ticket_class,
        }
    }
}

impl Default for ColumnPrefixes {
    fn default() -> Self {
        Self {
            airline: CategoryGroup::Airline.default_prefix().to_string(),
            origin: CategoryGroup::Origin.default_prefix().to_string(),
            destination: CategoryGroup::Destination.default_prefix().to_string(),
            ticket_class: CategoryGroup::TicketClass.default_prefix().to_string(),
        }
    }
}

/// How one-hot columns were named at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub prefixes: ColumnPrefixes,

    /// Category dropped from each group during training (all-zero encoding).
    pub reference_categories: PerGroup<Option<String>>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            prefixes: ColumnPrefixes::default(),
            reference_categories: PerGroup::default(),
        }
    }
}

/// Name of a one-hot column the models know about.
///
/// Only [`FeatureVocabulary`] hands these out, so holding one means the
/// column existed in at least one loaded schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMatch<'a> {
    Column(&'a ColumnId),
    Reference,
    Unknown,
}

#[derive(Debug, Clone, Default)]
struct GroupVocabulary {
    categories: Vec<String>,
    columns: HashMap<String, ColumnId>,
}

/// Per-group one-hot vocabulary derived from trained column names.
#[derive(Debug, Clone)]
pub struct FeatureVocabulary {
    prefixes: ColumnPrefixes,
    references: PerGroup<Option<String>>,
    groups: PerGroup<GroupVocabulary>,
}

impl FeatureVocabulary {
    pub fn from_schema(schema: &ModelSchema, config: &VocabularyConfig) -> Self {
        Self::from_schemas(std::iter::once(schema), config)
    }

    /// Union of the one-hot columns of every schema, in first-seen order.
    pub fn from_schemas<'a>(
        schemas: impl IntoIterator<Item = &'a ModelSchema>,
        config: &VocabularyConfig,
    ) -> Self {
        let mut vocabulary = Self {
            prefixes: config.prefixes.clone(),
            references: config.reference_categories.clone(),
            groups: PerGroup::default(),
        };

        for schema in schemas {
            for column in schema.columns() {
                let Some((group, category)) = vocabulary.split_column(column) else {
                    continue;
                };
                let category = category.to_string();
                let slot = vocabulary.groups.get_mut(group);
                if slot.columns.contains_key(&category) {
                    continue;
                }
                slot.categories.push(category.clone());
                slot.columns.insert(category, ColumnId(column.clone()));
            }
        }

        for group in CategoryGroup::ALL {
            tracing::debug!(
                "Vocabulary group {} has {} columns (reference: {:?})",
                group,
                vocabulary.groups.get(group).categories.len(),
                vocabulary.references.get(group)
            );
        }

        vocabulary
    }

    /// Split a column into (group, category) by its longest matching prefix.
    pub fn split_column<'c>(&self, column: &'c str) -> Option<(CategoryGroup, &'c str)> {
        CategoryGroup::ALL
            .iter()
            .filter_map(|&group| {
                let prefix = self.prefixes.get(group);
                if prefix.is_empty() {
                    return None;
                }
                column
                    .strip_prefix(prefix)
                    .filter(|category| !category.is_empty())
                    .map(|category| (group, prefix.len(), category))
            })
            .max_by_key(|(_, prefix_len, _)| *prefix_len)
            .map(|(group, _, category)| (group, category))
    }

    /// Typed lookup of the one-hot column for a raw value. The value is
    /// matched verbatim: no trimming, case folding or Unicode normalization.
    pub fn lookup(&self, group: CategoryGroup, value: &str) -> Option<&ColumnId> {
        self.groups.get(group).columns.get(value)
    }

    pub fn classify(&self, group: CategoryGroup, value: &str) -> CategoryMatch<'_> {
        if let Some(column) = self.lookup(group, value) {
            return CategoryMatch::Column(column);
        }
        match self.references.get(group) {
            Some(reference) if reference == value => CategoryMatch::Reference,
            _ => CategoryMatch::Unknown,
        }
    }

    pub fn categories(&self, group: CategoryGroup) -> &[String] {
        &self.groups.get(group).categories
    }

    pub fn reference_category(&self, group: CategoryGroup) -> Option<&str> {
        self.references.get(group).as_deref()
    }

    pub fn prefix(&self, group: CategoryGroup) -> &str {
        self.prefixes.get(group)
    }

    /// Selectable values for a group: the reference category followed by the
    /// trained columns.
    pub fn selectable(&self, group: CategoryGroup) -> Vec<String> {
        let mut values = Vec::with_capacity(self.categories(group).len() + 1);
        if let Some(reference) = self.reference_category(group) {
            values.push(reference.to_string());
        }
        values.extend(
            self.categories(group)
                .iter()
                .filter(|category| Some(category.as_str()) != self.reference_category(group))
                .cloned(),
        );
        values
    }

    /// Known value equal to `value` up to case and surrounding whitespace.
    pub fn suggest(&self, group: CategoryGroup, value: &str) -> Option<&str> {
        let wanted = value.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.categories(group)
            .iter()
            .map(String::as_str)
            .chain(self.reference_category(group))
            .find(|known| known.to_lowercase() == wanted)
    }
}
