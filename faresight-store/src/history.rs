use crate::StoreError;
use chrono::NaiveDateTime;
use faresight_catalog::{DurationTable, FeatureVocabulary};
use faresight_core::CategoryGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Timestamp layout of the historical export, e.g. `08:00:00 15/05/2021`.
pub const HISTORY_TIME_FORMAT: &str = "%H:%M:%S %d/%m/%Y";

/// One scraped flight. Columns not listed here are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalFlight {
    #[serde(rename = "code_name")]
    pub airline: String,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: String,
    #[serde(rename = "type")]
    pub ticket_class: String,
    pub f_time_from: String,
    pub f_time_to: String,
}

impl HistoricalFlight {
    pub fn departure(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.f_time_from.trim(), HISTORY_TIME_FORMAT).ok()
    }

    pub fn arrival(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.f_time_to.trim(), HISTORY_TIME_FORMAT).ok()
    }

    /// Flight time in minutes, when both timestamps parse.
    pub fn duration_minutes(&self) -> Option<f64> {
        let seconds = (self.arrival()? - self.departure()?).num_seconds();
        Some(seconds as f64 / 60.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightHistory {
    flights: Vec<HistoricalFlight>,
    skipped: usize,
}

impl FlightHistory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let history = Self::read(file)?;
        tracing::info!(
            "Loaded {} historical flights from {} ({} rows skipped)",
            history.len(),
            path.display(),
            history.skipped
        );
        Ok(history)
    }

    pub fn read<R: Read>(reader: R) -> Result<Self, StoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Fields)
            .from_reader(reader);

        let mut history = Self::default();
        for (line, record) in csv_reader.deserialize::<HistoricalFlight>().enumerate() {
            match record {
                Ok(flight) if flight.duration_minutes().is_some_and(|m| m > 0.0) => {
                    history.flights.push(flight)
                }
                Ok(flight) => {
                    tracing::warn!(
                        "Skipping record {}: bad times '{}' -> '{}'",
                        line + 1,
                        flight.f_time_from,
                        flight.f_time_to
                    );
                    history.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping record {}: {}", line + 1, e);
                    history.skipped += 1;
                }
            }
        }
        Ok(history)
    }

    pub fn flights(&self) -> &[HistoricalFlight] {
        &self.flights
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Mean observed duration per (origin, destination).
    pub fn duration_table(&self, default_minutes: u32) -> DurationTable {
        DurationTable::from_observations(
            self.flights.iter().filter_map(|f| {
                f.duration_minutes()
                    .map(|minutes| (f.origin.clone(), f.destination.clone(), minutes))
            }),
            default_minutes,
        )
    }

    pub fn options(&self) -> TripOptions {
        TripOptions {
            airlines: unique(self.flights.iter().map(|f| f.airline.as_str())),
            origins: unique(self.flights.iter().map(|f| f.origin.as_str())),
            destinations: unique(self.flights.iter().map(|f| f.destination.as_str())),
            ticket_classes: unique(self.flights.iter().map(|f| f.ticket_class.as_str())),
        }
    }
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Values a caller can pick from, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripOptions {
    pub airlines: Vec<String>,
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub ticket_classes: Vec<String>,
}

impl TripOptions {
    /// Fallback when no history is available: what the models were trained on.
    pub fn from_vocabulary(vocabulary: &FeatureVocabulary) -> Self {
        Self {
            airlines: vocabulary.selectable(CategoryGroup::Airline),
            origins: vocabulary.selectable(CategoryGroup::Origin),
            destinations: vocabulary.selectable(CategoryGroup::Destination),
            ticket_classes: vocabulary.selectable(CategoryGroup::TicketClass),
        }
    }

    /// Same options with `origin` removed from the destinations.
    /// Keeps the full list if that would leave nothing to pick.
    pub fn for_origin(&self, origin: &str) -> Self {
        let mut options = self.clone();
        let remaining: Vec<String> = self
            .destinations
            .iter()
            .filter(|d| d.as_str() != origin)
            .cloned()
            .collect();
        if !remaining.is_empty() {
            options.destinations = remaining;
        }
        options
    }
}
