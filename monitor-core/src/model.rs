use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One normalized forecast point reported by a provider.
///
/// `timestamp` is provider-local wall-clock time; calendar days are derived from it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub pressure: f64,
    pub is_raining: bool,
}

/// Average temperature of a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub average_temperature: f64,
}

/// Half-open `[start, end)` window of continuous rain that never crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RainInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Result of one aggregation cycle; each field comes from exactly one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub pressure: Option<f64>,
    pub temperature_by_day: Option<Vec<DayBucket>>,
    pub rain_intervals: Option<Vec<RainInterval>>,
}

impl AggregationReport {
    pub fn is_empty(&self) -> bool {
        self.pressure.is_none() && self.temperature_by_day.is_none() && self.rain_intervals.is_none()
    }
}
