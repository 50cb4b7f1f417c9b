use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial]
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

/// Current conditions for one city, as shown on a dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temp: i32,
    pub feels_like: i32,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: u16,
    pub description: String,
    pub icon: String,
    pub visibility: u32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub city: String,
    pub country: String,
}

/// One 3-hour step of the short-range forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: DateTime<Utc>,
    pub temp: i32,
    pub feels_like: i32,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
    /// Percentage in `0..=100`.
    pub precipitation_probability: u8,
}

/// Summary of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    /// Instant of the first provider entry falling on this day.
    pub date: DateTime<Utc>,
    pub temp_min: i32,
    pub temp_max: i32,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    /// Next 24 hours at 3-hour resolution, at most 8 points.
    pub hourly: Vec<HourlyPoint>,
    /// At most 5 days, chronological.
    pub daily: Vec<DailyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// Where a watch set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Defaults,
    Search,
    Favorites,
}

/// Ordered list of cities tracked for auto-refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSet {
    kind: WatchKind,
    cities: Vec<String>,
    with_forecast: bool,
}

impl WatchSet {
    pub fn defaults<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(WatchKind::Defaults, cities)
    }

    pub fn searched(city: impl Into<String>) -> Self {
        Self::new(WatchKind::Search, [city.into()])
    }

    pub fn favorites<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(WatchKind::Favorites, cities)
    }

    /// Refresh forecasts alongside current weather.
    pub fn with_forecast(mut self) -> Self {
        self.with_forecast = true;
        self
    }

    pub fn kind(&self) -> WatchKind {
        self.kind
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn includes_forecast(&self) -> bool {
        self.with_forecast
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    fn new<I, S>(kind: WatchKind, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for city in cities {
            let city = city.into().trim().to_string();
            if !city.is_empty() && !unique.contains(&city) {
                unique.push(city);
            }
        }

        Self {
            kind,
            cities: unique,
            with_forecast: false,
        }
    }
}
