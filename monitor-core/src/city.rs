//! Lookup over the OpenWeather bulk city list (`city.list.json`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::LocationError;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct City {
    pub name: String,
    pub country: String,
    #[serde(rename = "coord")]
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Default)]
pub struct CityList {
    cities: Vec<City>,
}

impl CityList {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read city list: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse city list: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cities: Vec<City> = serde_json::from_str(json)?;
        Ok(Self { cities })
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn find(&self, city: &str, country: &str) -> Result<&City, LocationError> {
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(city) && c.country.eq_ignore_ascii_case(country))
            .ok_or_else(|| LocationError::NotFound {
                city: city.to_string(),
                country: country.to_string(),
            })
    }

    /// Spelling of `input` as it appears in the list, if any city has that name.
    pub fn canonical_city(&self, input: &str) -> Option<&str> {
        let input = input.trim();
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(input))
            .map(|c| c.name.as_str())
    }

    /// Country code as it appears in the list, if `city` exists in that country.
    pub fn canonical_country(&self, city: &str, input: &str) -> Option<&str> {
        let input = input.trim();
        self.cities
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(city))
            .find(|c| c.country.eq_ignore_ascii_case(input))
            .map(|c| c.country.as_str())
    }
}
