use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use skyboard_core::{
    Config, OpenWeatherClient, OpenWeatherConfig, RefreshScheduler, SchedulerConfig, Units,
    WatchSet, WeatherSource,
};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyboard", version, about = "City weather dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and preferred units.
    Configure,

    /// Show current weather for a city.
    Current {
        city: String,

        /// "metric" or "imperial"; defaults to the configured units.
        #[arg(long)]
        units: Option<String>,
    },

    /// Show the 24-hour and 5-day forecast for a city.
    Forecast {
        city: String,

        #[arg(long)]
        units: Option<String>,
    },

    /// Look up cities matching a name.
    Search { query: String },

    /// Show or change the configured units.
    Units {
        /// New units: "metric" or "imperial".
        units: Option<String>,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Keep refreshing a set of cities until Ctrl-C.
    Watch {
        /// Watch a single city instead of the default list.
        #[arg(long, conflicts_with = "favorites")]
        city: Option<String>,

        /// Watch the favorites instead of the default list.
        #[arg(long)]
        favorites: bool,

        /// Refresh forecasts too.
        #[arg(long)]
        forecast: bool,

        #[arg(long)]
        units: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    List,
    Add { city: String },
    Remove { city: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config)?,
            Command::Current { city, units } => {
                let units = resolve_units(&config, units.as_deref())?;
                let client = build_client(&config)?;
                let snapshot = client
                    .fetch_current(&city, units)
                    .await
                    .with_context(|| format!("Could not fetch current weather for '{city}'"))?;
                output::print_snapshot(&snapshot, units, config.is_favorite(city.trim()));
            }
            Command::Forecast { city, units } => {
                let units = resolve_units(&config, units.as_deref())?;
                let client = build_client(&config)?;
                let forecast = client
                    .fetch_forecast(&city, units)
                    .await
                    .with_context(|| format!("Could not fetch forecast for '{city}'"))?;
                output::print_forecast(&city, &forecast, units);
            }
            Command::Search { query } => {
                let client = build_client(&config)?;
                let suggestions = client
                    .search_cities(&query)
                    .await
                    .with_context(|| format!("City search for '{query}' failed"))?;
                output::print_suggestions(&suggestions);
            }
            Command::Units { units } => match units {
                Some(units) => {
                    let units = Units::try_from(units.as_str())?;
                    config.set_units(units);
                    config.save()?;
                    println!("Units set to {units}.");
                }
                None => println!("{}", config.units),
            },
            Command::Favorites { action } => favorites(&mut config, action)?,
            Command::Watch {
                city,
                favorites,
                forecast,
                units,
            } => {
                let units = resolve_units(&config, units.as_deref())?;
                let mut watch_set = match (city, favorites) {
                    (Some(city), _) => WatchSet::searched(city),
                    (None, true) => WatchSet::favorites(config.favorites.clone()),
                    (None, false) => WatchSet::defaults(config.default_cities.clone()),
                };
                if forecast {
                    watch_set = watch_set.with_forecast();
                }
                watch(&config, watch_set, units).await?;
            }
        }

        Ok(())
    }
}

fn resolve_units(config: &Config, flag: Option<&str>) -> Result<Units> {
    match flag {
        Some(units) => Units::try_from(units),
        None => Ok(config.units),
    }
}

fn build_client(config: &Config) -> Result<OpenWeatherClient> {
    OpenWeatherClient::new(OpenWeatherConfig::from_config(config)?)
}

fn configure(config: &mut Config) -> Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let options = Units::all().to_vec();
    let cursor = options.iter().position(|u| *u == config.units).unwrap_or(0);
    let units = Select::new("Units:", options)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read units")?;

    config.set_api_key(api_key.trim().to_string());
    config.set_units(units);
    config.save()?;

    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn favorites(config: &mut Config, action: FavoritesCommand) -> Result<()> {
    match action {
        FavoritesCommand::List => {
            if config.favorites.is_empty() {
                println!("No favorites yet.");
            }
            for city in &config.favorites {
                println!("♥ {city}");
            }
        }
        FavoritesCommand::Add { city } => {
            if config.add_favorite(&city) {
                config.save()?;
                println!("Added {} to favorites.", city.trim());
            } else {
                println!("{} is already a favorite.", city.trim());
            }
        }
        FavoritesCommand::Remove { city } => {
            if config.remove_favorite(&city) {
                config.save()?;
                println!("Removed {} from favorites.", city.trim());
            } else {
                println!("{} is not a favorite.", city.trim());
            }
        }
    }
    Ok(())
}

async fn watch(config: &Config, watch_set: WatchSet, units: Units) -> Result<()> {
    if watch_set.is_empty() {
        bail!(
            "Nothing to watch.\n\
             Hint: add favorites with `skyboard favorites add <city>`."
        );
    }

    let source: Arc<dyn WeatherSource> = Arc::new(build_client(config)?);
    let (scheduler, mut events) =
        RefreshScheduler::new(source, SchedulerConfig::from(&config.refresh));

    println!(
        "Watching {} (refresh every {}s, Ctrl-C to stop)",
        watch_set.cities().join(", "),
        config.refresh.cadence_secs
    );
    let handle = scheduler.start_watching(watch_set, units);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Some(event) => output::print_event(&event, units),
                None => break,
            },
        }
    }

    handle.stop().await;
    tracing::info!("watch ended");
    Ok(())
}
