use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Categorical inputs the fare models were trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Airline,
    Origin,
    Destination,
    TicketClass,
}

impl CategoryGroup {
    pub const ALL: [CategoryGroup; 4] = [
        CategoryGroup::Airline,
        CategoryGroup::Origin,
        CategoryGroup::Destination,
        CategoryGroup::TicketClass,
    ];

    /// Column prefix used when the models were exported.
    pub fn default_prefix(&self) -> &'static str {
        match self {
            CategoryGroup::Airline => "airline_",
            CategoryGroup::Origin => "from_",
            CategoryGroup::Destination => "to_",
            CategoryGroup::TicketClass => "type_",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryGroup::Airline => "airline",
            CategoryGroup::Origin => "origin",
            CategoryGroup::Destination => "destination",
            CategoryGroup::TicketClass => "ticket_class",
        }
    }
}

impl std::fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fare estimation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripQuery {
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub ticket_class: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    /// Explicit arrival, when the caller already knows it.
    #[serde(default)]
    pub arrival: Option<NaiveDateTime>,
}

impl TripQuery {
    pub fn departure(&self) -> NaiveDateTime {
        self.departure_date.and_time(self.departure_time)
    }

    /// Raw value the caller picked for a group.
    pub fn category(&self, group: CategoryGroup) -> &str {
        match group {
            CategoryGroup::Airline => &self.airline,
            CategoryGroup::Origin => &self.origin,
            CategoryGroup::Destination => &self.destination,
            CategoryGroup::TicketClass => &self.ticket_class,
        }
    }
}
