use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::Client;
use serde::{Deserialize, de::IgnoredAny};
use tracing::debug;

use crate::{
    config::{Config, Language, Unit},
    error::FetchError,
    model::ForecastSample,
    provider::{SampleBuffer, fetch_body, local_time},
};

use super::{ProviderId, SourceReader};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// OpenWeather's 5-day forecast comes in 3-hour steps.
pub const SAMPLING_PERIOD_HOURS: i64 = 3;

#[derive(Debug, Clone)]
pub struct OpenWeatherReader {
    api_key: String,
    base_url: String,
    city: String,
    country: String,
    unit: Unit,
    language: Language,
    http: Client,
    buffer: SampleBuffer,
}

impl OpenWeatherReader {
    pub fn new(api_key: String, base_url: Option<String>, config: &Config, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            city: config.city.clone(),
            country: config.country.clone(),
            unit: config.unit,
            language: config.language,
            http,
            buffer: SampleBuffer::new(config.days),
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("appid", self.api_key.clone()),
            ("q", format!("{},{}", self.city, self.country.to_lowercase())),
            ("units", self.unit.as_str().to_string()),
            ("lang", language_code(self.language).to_string()),
        ]
    }

    async fn download(&self) -> Result<Vec<ForecastSample>, FetchError> {
        let url = format!("{}/forecast", self.base_url.trim_end_matches('/'));
        debug!(source = %ProviderId::OpenWeather, city = %self.city, "Requesting forecast");

        let body = fetch_body(self.http.get(url).query(&self.query())).await?;
        parse_forecast(&body)
    }
}

fn language_code(language: Language) -> &'static str {
    match language {
        Language::En => "en_us",
        Language::Sv => "sv_se",
        Language::Zh => "zh_cn",
        Language::Ru => "ru_ru",
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    /// Only present for steps with precipitation.
    #[serde(default)]
    rain: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Shift from UTC in seconds.
    #[serde(default)]
    timezone: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
    #[serde(default)]
    city: Option<OwCity>,
}

fn parse_forecast(body: &str) -> Result<Vec<ForecastSample>, FetchError> {
    let parsed: OwForecastResponse = serde_json::from_str(body)?;
    let offset = parsed.city.and_then(|c| c.timezone).unwrap_or(0);

    parsed
        .list
        .into_iter()
        .map(|entry| {
            Ok(ForecastSample {
                timestamp: local_time(entry.dt, offset)?,
                temperature: entry.main.temp,
                pressure: entry.main.pressure,
                is_raining: entry.rain.is_some(),
            })
        })
        .collect()
}

#[async_trait]
impl SourceReader for OpenWeatherReader {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
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
