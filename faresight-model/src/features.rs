use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use faresight_core::{FareError, FareResult};
use serde::Serialize;

pub const HOUR: &str = "hour";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const DAY: &str = "day";
pub const MONTH: &str = "month";
pub const DURATION_MINUTES: &str = "duration_minutes";
pub const BASELINE_FEE: &str = "baseline_fee";

/// Calendar and clock features of a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemporalFeatures {
    /// Wall-clock hour, 0-23. No timezone conversion.
    pub hour: u32,
    /// Monday = 0 ... Sunday = 6, the convention the models were trained with.
    pub day_of_week: u32,
    pub day: u32,
    pub month: u32,
    pub duration_minutes: u32,

    // Display only, never part of a feature row
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
}

impl TemporalFeatures {
    /// Fails only when the arrival falls past the last representable date.
    pub fn extract(date: NaiveDate, time: NaiveTime, duration_minutes: u32) -> FareResult<Self> {
        let departure = date.and_time(time);
        let arrival = departure
            .checked_add_signed(Duration::minutes(duration_minutes as i64))
            .ok_or(FareError::DateOutOfRange {
                departure,
                minutes: duration_minutes,
            })?;

        Ok(Self {
            hour: time.hour(),
            day_of_week: date.weekday().num_days_from_monday(),
            day: date.day(),
            month: date.month(),
            duration_minutes,
            departure,
            arrival,
        })
    }
}

/// Check a caller-supplied arrival and return the flight time it implies,
/// in whole minutes (at least one).
pub fn validate_time_range(departure: NaiveDateTime, arrival: NaiveDateTime) -> FareResult<u32> {
    if arrival <= departure {
        return Err(FareError::InvalidTimeRange { departure, arrival });
    }
    let minutes = (arrival - departure).num_minutes().max(1);
    Ok(u32::try_from(minutes).unwrap_or(u32::MAX))
}

/// Every numeric input a fare model may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericFeatures {
    #[serde(flatten)]
    pub temporal: TemporalFeatures,
    pub baseline_fee: f64,
}

impl NumericFeatures {
    pub fn new(temporal: TemporalFeatures, baseline_fee: f64) -> Self {
        Self { temporal, baseline_fee }
    }

    /// (column name, value) pairs, in a fixed order.
    pub fn columns(&self) -> [(&'static str, f64); 6] {
        [
            (HOUR, self.temporal.hour as f64),
            (DAY_OF_WEEK, self.temporal.day_of_week as f64),
            (DAY, self.temporal.day as f64),
            (MONTH, self.temporal.month as f64),
            (DURATION_MINUTES, self.temporal.duration_minutes as f64),
            (BASELINE_FEE, self.baseline_fee),
        ]
    }
}
