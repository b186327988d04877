use crate::{
    analysis,
    city::CityList,
    config::Config,
    error::{FetchError, MetricError},
    model::{DayBucket, ForecastSample, RainInterval},
    provider::{darksky::DarkSkyReader, openweather::OpenWeatherReader},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, time::Duration};
use tracing::{debug, info, warn};

pub mod darksky;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenWeather,
    DarkSky,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::DarkSky => "darksky",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::DarkSky]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "darksky" => Ok(ProviderId::DarkSky),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, darksky."
            )),
        }
    }
}

/// One forecast provider together with the samples retained from its last successful fetch.
///
/// Derived queries must only be called after `fetch` returned `true` in the same cycle.
#[async_trait]
pub trait SourceReader: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Native step between consecutive samples; closes a rain spell still open at the end.
    fn sampling_period(&self) -> TimeDelta;

    fn days(&self) -> u8;

    fn samples(&self) -> &[ForecastSample];

    /// One round-trip to the provider. On failure the retained samples are left as they were.
    async fn fetch(&mut self) -> bool;

    fn average_pressure(&self) -> Result<f64, MetricError> {
        analysis::average_pressure(self.samples())
    }

    fn average_temperature(&self) -> Result<Vec<DayBucket>, MetricError> {
        analysis::daily_average_temperatures(self.samples(), self.days())
    }

    fn rain_intervals(&self) -> Result<Vec<RainInterval>, MetricError> {
        Ok(analysis::rain_intervals(self.samples(), self.sampling_period()))
    }
}

/// Samples owned by a reader, replaced wholesale on every successful fetch.
#[derive(Debug, Clone)]
pub(crate) struct SampleBuffer {
    days: u8,
    samples: Vec<ForecastSample>,
}

impl SampleBuffer {
    pub(crate) fn new(days: u8) -> Self {
        Self { days, samples: Vec::new() }
    }

    pub(crate) fn days(&self) -> u8 {
        self.days
    }

    pub(crate) fn samples(&self) -> &[ForecastSample] {
        &self.samples
    }

    /// Store a fetch result trimmed to the horizon, or log why it was rejected.
    pub(crate) fn replace(
        &mut self,
        source: ProviderId,
        fetched: Result<Vec<ForecastSample>, FetchError>,
    ) -> bool {
        let trimmed = fetched.and_then(|samples| {
            let samples = analysis::trim_to_horizon(samples, self.days);
            if samples.is_empty() { Err(FetchError::NoSamples) } else { Ok(samples) }
        });

        match trimmed {
            Ok(samples) => {
                info!(source = %source, samples = samples.len(), "Forecast fetched");
                self.samples = samples;
                true
            }
            Err(err) => {
                warn!(source = %source, error = %err, "Forecast fetch failed");
                false
            }
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Send a GET and return the body of a successful, non-blank response.
pub(crate) async fn fetch_body(request: RequestBuilder) -> Result<String, FetchError> {
    let res = request.send().await?;

    let status = res.status();
    let body = res.text().await?;
    debug!(%status, bytes = body.len(), "Provider responded");

    if !status.is_success() {
        return Err(FetchError::Status { status, body: truncate_body(&body) });
    }
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }

    Ok(body)
}

/// Unix seconds shifted by the provider's UTC offset, giving local wall-clock time.
pub(crate) fn local_time(ts: i64, offset_secs: i64) -> Result<NaiveDateTime, FetchError> {
    DateTime::from_timestamp(ts, 0)
        .and_then(|utc| utc.naive_utc().checked_add_signed(TimeDelta::seconds(offset_secs)))
        .ok_or(FetchError::InvalidTimestamp(ts))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Construct a reader from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    cities: &CityList,
) -> anyhow::Result<Box<dyn SourceReader>> {
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather-monitor key {id}` and enter your API key."
        )
    })?;
    let base_url = config.provider_config(id).and_then(|p| p.base_url.clone());
    let http = http_client(config.request_timeout())?;

    let boxed: Box<dyn SourceReader> = match id {
        ProviderId::OpenWeather => {
            Box::new(OpenWeatherReader::new(api_key.to_owned(), base_url, config, http))
        }
        ProviderId::DarkSky => {
            let city = cities.find(&config.city, &config.country)?;
            Box::new(DarkSkyReader::new(
                api_key.to_owned(),
                base_url,
                city.coordinates,
                config,
                http,
            ))
        }
    };

    Ok(boxed)
}

/// Readers for every configured source, in configured order. Unusable sources are skipped.
pub fn readers_from_config(config: &Config, cities: &CityList) -> Vec<Box<dyn SourceReader>> {
    config
        .sources
        .iter()
        .filter_map(|&id| match provider_from_config(id, config, cities) {
            Ok(reader) => Some(reader),
            Err(err) => {
                warn!(source = %id, error = %err, "Skipping forecast source");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::{City, Coordinates};

    fn cities() -> CityList {
        CityList::new(vec![City {
            name: "New York".into(),
            country: "US".into(),
            coordinates: Coordinates { lat: 40.71, lon: -74.0 },
        }])
    }

    fn sample(ts: i64) -> ForecastSample {
        ForecastSample {
            timestamp: local_time(ts, 0).unwrap(),
            temperature: 1.0,
            pressure: 1.0,
            is_raining: false,
        }
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("accuweather").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::OpenWeather, &cfg, &cities()).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn darksky_requires_known_city() {
        let mut cfg = Config { city: "Atlantis".into(), ..Config::default() };
        cfg.upsert_provider_api_key(ProviderId::DarkSky, "KEY".into());

        let err = provider_from_config(ProviderId::DarkSky, &cfg, &cities()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn readers_follow_configured_order_and_skip_unusable() {
        let mut cfg = Config {
            sources: vec![ProviderId::DarkSky, ProviderId::OpenWeather],
            ..Config::default()
        };
        cfg.upsert_provider_api_key(ProviderId::DarkSky, "DS".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".into());

        let readers = readers_from_config(&cfg, &cities());
        let ids: Vec<_> = readers.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![ProviderId::DarkSky, ProviderId::OpenWeather]);

        let readers = readers_from_config(&cfg, &CityList::default());
        let ids: Vec<_> = readers.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![ProviderId::OpenWeather]);
    }

    #[test]
    fn failed_fetch_keeps_previous_samples() {
        let mut buffer = SampleBuffer::new(5);

        assert!(buffer.replace(ProviderId::OpenWeather, Ok(vec![sample(0), sample(3600)])));
        assert!(!buffer.replace(ProviderId::OpenWeather, Err(FetchError::EmptyBody)));
        assert!(!buffer.replace(ProviderId::OpenWeather, Ok(Vec::new())));

        assert_eq!(buffer.samples().len(), 2);
    }

    #[test]
    fn successful_fetch_replaces_samples_wholesale() {
        let mut buffer = SampleBuffer::new(1);

        assert!(buffer.replace(ProviderId::DarkSky, Ok(vec![sample(0), sample(3600)])));
        assert!(buffer.replace(ProviderId::DarkSky, Ok(vec![sample(7200), sample(200_000)])));

        assert_eq!(buffer.samples(), &[sample(7200)]);
    }

    #[test]
    fn local_time_applies_offset() {
        let local = local_time(1_704_067_200, -5 * 3600).unwrap();
        assert_eq!(local.to_string(), "2023-12-31 19:00:00");
        assert!(matches!(local_time(i64::MAX, 0), Err(FetchError::InvalidTimestamp(_))));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
