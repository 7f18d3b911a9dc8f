pub mod route;
pub mod fees;
pub mod schema;
pub mod vocabulary;

pub use route::{DurationTable, ResolvedDuration, RouteEntry, RouteKey, DEFAULT_DURATION_MINUTES};
pub use fees::FeeTable;
pub use schema::ModelSchema;
pub use vocabulary::{CategoryMatch, ColumnId, ColumnPrefixes, FeatureVocabulary, PerGroup, VocabularyConfig};

/// Read-only lookup tables shared by every request.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub durations: DurationTable,
    pub fees: FeeTable,
}

impl ReferenceTables {
    pub fn new(durations: DurationTable, fees: FeeTable) -> Self {
        Self { durations, fees }
    }
}
