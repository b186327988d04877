use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use monitor_core::{CityList, Config, ConsoleSink, Monitor, ProviderId, readers_from_config};
use tracing::{debug, info, warn};

use crate::prompt;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-monitor", version, about = "Periodic multi-provider weather report")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set location, units, language, horizon and poll interval.
    Configure,

    /// Store the API key for a provider.
    Key {
        /// Provider short name, e.g. "openweather" or "darksky".
        provider: String,
    },

    /// Poll every configured provider and print a report each interval.
    Run {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = self.load_config()?;

        match self.command {
            Command::Configure => {
                let cities = CityList::load(&config.city_list_path)?;
                prompt::configure(&mut config, &cities).context("Configuration aborted")?;
                self.save_config(&config)?;
                println!("Configuration saved.");
            }
            Command::Key { ref provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let replacing = config.is_provider_configured(id);
                let api_key = prompt::api_key(id)?;
                config.upsert_provider_api_key(id, api_key);
                self.save_config(&config)?;
                println!("{}", key_saved_message(id, replacing));
            }
            Command::Run { once } => run_monitor(&config, once).await?,
        }

        Ok(())
    }

    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    fn save_config(&self, config: &Config) -> Result<()> {
        match &self.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
    }
}

fn key_saved_message(id: ProviderId, replaced: bool) -> String {
    if replaced {
        format!("API key for {id} replaced.")
    } else {
        format!("API key for {id} saved, {id} is now polled.")
    }
}

async fn run_monitor(config: &Config, once: bool) -> Result<()> {
    config.validate()?;

    let cities = match CityList::load(&config.city_list_path) {
        Ok(cities) => cities,
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(error = %reason, "City list unavailable, coordinate lookups will fail");
            CityList::default()
        }
    };

    if cities.is_empty() {
        warn!(
            path = %config.city_list_path.display(),
            "City list is empty, Dark Sky cannot locate the city"
        );
    } else {
        debug!(cities = cities.len(), "City list loaded");
    }

    let readers = readers_from_config(config, &cities);
    if readers.is_empty() {
        warn!("No usable forecast source, reports will be empty. Hint: run `weather-monitor key <provider>`.");
    }

    info!(
        city = %config.city,
        country = %config.country,
        days = config.days,
        sources = readers.len(),
        "Monitoring forecast"
    );

    let monitor = Monitor::new(
        readers,
        Box::new(ConsoleSink::new()),
        config.unit,
        config.poll_interval()?,
    );

    if once {
        monitor.run_once().await;
        return Ok(());
    }

    monitor
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
