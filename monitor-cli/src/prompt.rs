//! Interactive configuration prompts.

use anyhow::Result;
use inquire::{
    CustomType, Password, PasswordDisplayMode, Select, Text, validator::Validation,
};
use monitor_core::{
    CityList, Config, Language, ProviderId, Unit,
    config::{MAX_DAYS, MIN_DAYS, MIN_POLL_INTERVAL_MINUTES},
};

/// Ask for every monitor setting, using the current values as defaults.
pub fn configure(config: &mut Config, cities: &CityList) -> Result<()> {
    config.poll_interval_minutes = CustomType::<f64>::new("Poll interval in minutes:")
        .with_default(config.poll_interval_minutes)
        .with_error_message("Please enter a number")
        .with_validator(|minutes: &f64| Ok(poll_interval_validation(*minutes)))
        .prompt()?;

    let city_list = cities.clone();
    let city = Text::new("City:")
        .with_default(&config.city)
        .with_validator(move |input: &str| {
            Ok(match city_list.canonical_city(input) {
                Some(_) => Validation::Valid,
                None => Validation::Invalid("Cannot find this city, please try another".into()),
            })
        })
        .prompt()?;
    config.city = cities.canonical_city(&city).unwrap_or(city.trim()).to_string();

    let city_list = cities.clone();
    let chosen_city = config.city.clone();
    let country = Text::new("Country code:")
        .with_default(&config.country)
        .with_validator(move |input: &str| {
            Ok(match city_list.canonical_country(&chosen_city, input) {
                Some(_) => Validation::Valid,
                None => Validation::Invalid(
                    "Cannot find this city in that country, please try another".into(),
                ),
            })
        })
        .prompt()?;
    config.country = cities
        .canonical_country(&config.city, &country)
        .unwrap_or(country.trim())
        .to_string();

    config.unit = Select::new("Unit of measure:", Unit::all().to_vec())
        .with_starting_cursor(position(Unit::all(), &config.unit))
        .prompt()?;

    config.language = Select::new("Language:", Language::all().to_vec())
        .with_starting_cursor(position(Language::all(), &config.language))
        .prompt()?;

    config.days = CustomType::<u8>::new("Number of days to forecast:")
        .with_default(config.days)
        .with_error_message("Please enter a whole number")
        .with_validator(|days: &u8| Ok(days_validation(*days)))
        .prompt()?;

    Ok(())
}

pub fn api_key(id: ProviderId) -> Result<String> {
    let key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(|input: &str| {
            Ok(if input.trim().is_empty() {
                Validation::Invalid("API key must not be empty".into())
            } else {
                Validation::Valid
            })
        })
        .prompt()?;

    Ok(key.trim().to_string())
}

fn poll_interval_validation(minutes: f64) -> Validation {
    if minutes.is_finite() && minutes >= MIN_POLL_INTERVAL_MINUTES {
        Validation::Valid
    } else {
        Validation::Invalid(
            format!("Poll interval must be at least {MIN_POLL_INTERVAL_MINUTES} minute").into(),
        )
    }
}

fn days_validation(days: u8) -> Validation {
    if (MIN_DAYS..=MAX_DAYS).contains(&days) {
        Validation::Valid
    } else {
        Validation::Invalid(format!("Days must be between {MIN_DAYS} and {MAX_DAYS}").into())
    }
}

fn position<T: PartialEq>(options: &[T], current: &T) -> usize {
    options.iter().position(|o| o == current).unwrap_or(0)
}
