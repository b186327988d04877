//! Core library for the weather monitor.
//!
//! This crate defines:
//! - Configuration & city lookup
//! - Forecast source readers (OpenWeather, Dark Sky) behind one trait
//! - Day bucketing and rain-interval extraction
//! - The aggregation cycle, its periodic driver and report rendering
//!
//! It is used by `weather-monitor`, but can also be reused by other binaries or services.

pub mod analysis;
pub mod city;
pub mod config;
pub mod cycle;
pub mod error;
pub mod model;
pub mod provider;
pub mod report;

pub use city::{City, CityList, Coordinates};
pub use config::{Config, Language, ProviderConfig, Unit};
pub use cycle::{Monitor, collect};
pub use error::{FetchError, LocationError, Metric, MetricError};
pub use model::{AggregationReport, DayBucket, ForecastSample, RainInterval};
pub use provider::{ProviderId, SourceReader, provider_from_config, readers_from_config};
pub use report::{ConsoleSink, ReportSink, render};
