use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Derived value computed from a reader's retained samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Pressure,
    Temperature,
    Rain,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Pressure => "average pressure",
            Metric::Temperature => "average temperature",
            Metric::Rain => "rain intervals",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a single provider round-trip yields no usable samples.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response body was empty")]
    EmptyBody,

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid timestamp {0} in response")]
    InvalidTimestamp(i64),

    #[error("response contained no forecast samples")]
    NoSamples,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("cannot compute {0} without forecast samples")]
    EmptyInput(Metric),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("city '{city}' in country '{country}' not found in city list")]
    NotFound { city: String, country: String },
}
