use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    city::Coordinates,
    config::{Config, Language, Unit},
    error::FetchError,
    model::ForecastSample,
    provider::{SampleBuffer, fetch_body, local_time},
};

use super::{ProviderId, SourceReader};

pub const DEFAULT_BASE_URL: &str = "https://api.darksky.net/forecast";

/// Hourly block resolution.
pub const SAMPLING_PERIOD_HOURS: i64 = 1;

/// A step counts as rainy above this precipitation probability.
pub const RAIN_PROBABILITY_THRESHOLD: f64 = 0.5;

const EXCLUDED_BLOCKS: &str = "currently,minutely,daily,alerts,flags";

#[derive(Debug, Clone)]
pub struct DarkSkyReader {
    api_key: String,
    base_url: String,
    coordinates: Coordinates,
    unit: Unit,
    language: Language,
    http: Client,
    buffer: SampleBuffer,
}

impl DarkSkyReader {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        coordinates: Coordinates,
        config: &Config,
        http: Client,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            coordinates,
            unit: config.unit,
            language: config.language,
            http,
            buffer: SampleBuffer::new(config.days),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}/{},{}",
            self.base_url.trim_end_matches('/'),
            self.api_key,
            self.coordinates.lat,
            self.coordinates.lon
        )
    }

    fn query(&self) -> Vec<(&'static str, &'static str)> {
        let units = match self.unit {
            Unit::Imperial => "us",
            Unit::Metric => "si",
        };

        vec![("lang", self.language.as_str()), ("units", units), ("exclude", EXCLUDED_BLOCKS)]
    }

    async fn download(&self) -> Result<Vec<ForecastSample>, FetchError> {
        debug!(
            source = %ProviderId::DarkSky,
            lat = self.coordinates.lat,
            lon = self.coordinates.lon,
            "Requesting forecast"
        );

        let body = fetch_body(self.http.get(self.url()).query(&self.query())).await?;
        parse_forecast(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DsDataPoint {
    time: i64,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    precip_probability: f64,
}

#[derive(Debug, Deserialize)]
struct DsHourly {
    #[serde(default)]
    data: Vec<DsDataPoint>,
}

#[derive(Debug, Deserialize)]
struct DsForecastResponse {
    /// Local shift from UTC in hours; may be fractional.
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    hourly: Option<DsHourly>,
}

fn parse_forecast(body: &str) -> Result<Vec<ForecastSample>, FetchError> {
    let parsed: DsForecastResponse = serde_json::from_str(body)?;
    let offset_secs = parsed.offset.map_or(0, |hours| (hours * 3600.0).round() as i64);

    parsed
        .hourly
        .map(|h| h.data)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|point| {
            let (Some(temperature), Some(pressure)) = (point.temperature, point.pressure) else {
                debug!(time = point.time, "Skipping incomplete hourly point");
                return None;
            };
            Some(local_time(point.time, offset_secs).map(|timestamp| ForecastSample {
                timestamp,
                temperature,
                pressure,
                is_raining: point.precip_probability > RAIN_PROBABILITY_THRESHOLD,
            }))
        })
        .collect()
}

#[async_trait]
impl SourceReader for DarkSkyReader {
    fn id(&self) -> ProviderId {
        ProviderId::DarkSky
    }

    fn sampling_period(&self) -> TimeDelta {
        TimeDelta::hours(SAMPLING_PERIOD_HOURS)
    }

    fn days(&self) -> u8 {
        self.buffer.days()
    }

    fn samples(&self) -> &[ForecastSample] {
        self.buffer.samples()
    }

    async fn fetch(&mut self) -> bool {
        let fetched = self.download().await;
        self.buffer.replace(self.id(), fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(unit: Unit) -> DarkSkyReader {
        let cfg = Config { unit, language: Language::Ru, ..Config::default() };
        DarkSkyReader::new(
            "SECRET".into(),
            Some("http://localhost:9999/forecast/".into()),
            Coordinates { lat: 43.000351, lon: -75.499901 },
            &cfg,
            Client::new(),
        )
    }

    #[test]
    fn url_embeds_key_and_coordinates() {
        assert_eq!(
            reader(Unit::Imperial).url(),
            "http://localhost:9999/forecast/SECRET/43.000351,-75.499901"
        );
    }

    #[test]
    fn query_maps_units_and_language() {
        assert_eq!(
            reader(Unit::Metric).query(),
            vec![("lang", "ru"), ("units", "si"), ("exclude", EXCLUDED_BLOCKS)]
        );
        assert_eq!(reader(Unit::Imperial).query()[1], ("units", "us"));
    }

    #[test]
    fn rain_follows_probability_threshold() {
        let body = r#"{
            "latitude": 43.0,
            "longitude": -75.5,
            "timezone": "America/New_York",
            "offset": -5,
            "hourly": {
                "summary": "Rain",
                "data": [
                    {"time": 1704067200, "temperature": 33.1, "pressure": 1015.2, "precipProbability": 0.2},
                    {"time": 1704070800, "temperature": 32.0, "pressure": 1014.0, "precipProbability": 0.75},
                    {"time": 1704074400, "temperature": 31.0, "pressure": 1013.0, "precipProbability": 0.5},
                    {"time": 1704078000, "temperature": 30.0, "pressure": 1012.0}
                ]
            }
        }"#;

        let samples = parse_forecast(body).expect("valid forecast");

        assert_eq!(samples[0].timestamp.to_string(), "2023-12-31 19:00:00");
        assert_eq!(
            samples.iter().map(|s| s.is_raining).collect::<Vec<_>>(),
            vec![false, true, false, false]
        );
    }

    #[test]
    fn incomplete_points_are_dropped_without_losing_the_forecast() {
        let body = r#"{
            "offset": 0,
            "hourly": {"data": [
                {"time": 1704067200, "temperature": 10.0, "pressure": 1010.0, "precipProbability": 0.9},
                {"time": 1704070800, "temperature": 11.0, "precipProbability": 0.9},
                {"time": 1704074400, "pressure": 1012.0},
                {"time": 1704078000, "temperature": 12.0, "pressure": 1014.0}
            ]}
        }"#;

        let samples = parse_forecast(body).expect("incomplete points are tolerated");

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp.to_string(), "2024-01-01 00:00:00");
        assert_eq!(samples[1].timestamp.to_string(), "2024-01-01 03:00:00");
        assert!((samples[1].pressure - 1014.0).abs() < f64::EPSILON);
        assert!(samples[0].is_raining);
    }

    #[test]
    fn missing_hourly_block_parses_to_no_samples() {
        let samples = parse_forecast(r#"{"latitude": 1.0, "longitude": 2.0}"#).expect("valid");
        assert!(samples.is_empty());
    }
}
