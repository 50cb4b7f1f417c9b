//! Mapping of raw OpenWeather payloads into the dashboard's weather shapes.
//!
//! Everything here is a pure function of its input.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{CitySuggestion, DailyPoint, ForecastBundle, HourlyPoint, WeatherSnapshot},
};

/// Number of forecast steps kept for the hourly strip (24h at 3h resolution).
pub const HOURLY_POINTS: usize = 8;
/// Number of calendar days kept for the daily summary.
pub const DAILY_POINTS: usize = 5;
/// Upper bound on suggestions returned by a city search.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct OwWeather {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwWind {
    pub speed: f64,
    pub deg: u16,
}

/// Forecast entries only carry speed through; calm slots may omit `deg`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwForecastWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwCurrentMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwSys {
    pub sunrise: i64,
    pub sunset: i64,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwCurrentResponse {
    pub name: String,
    pub main: OwCurrentMain,
    pub weather: Vec<OwWeather>,
    pub wind: OwWind,
    pub visibility: u32,
    pub sys: OwSys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwForecastMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwForecastEntry {
    pub dt: i64,
    pub main: OwForecastMain,
    pub weather: Vec<OwWeather>,
    pub wind: OwForecastWind,
    /// Probability of precipitation in `[0, 1]`.
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwForecastResponse {
    pub list: Vec<OwForecastEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwFindSys {
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwFindEntry {
    pub name: String,
    pub coord: OwCoord,
    pub sys: OwFindSys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwFindResponse {
    #[serde(default)]
    pub list: Vec<OwFindEntry>,
}

pub fn current_snapshot(raw: OwCurrentResponse) -> Result<WeatherSnapshot, FetchError> {
    let condition = primary_condition(&raw.weather, "current weather")?;

    Ok(WeatherSnapshot {
        temp: round_temp(raw.main.temp),
        feels_like: round_temp(raw.main.feels_like),
        humidity: raw.main.humidity,
        pressure: raw.main.pressure,
        wind_speed: raw.wind.speed,
        wind_deg: raw.wind.deg,
        description: condition.description.clone(),
        icon: condition.icon.clone(),
        visibility: raw.visibility,
        sunrise: unix_to_utc(raw.sys.sunrise)?,
        sunset: unix_to_utc(raw.sys.sunset)?,
        city: raw.name,
        country: raw.sys.country,
    })
}

/// Forecast bundle with days split on the local calendar.
pub fn forecast_bundle(raw: &OwForecastResponse) -> Result<ForecastBundle, FetchError> {
    forecast_bundle_in(raw, &Local)
}

/// Forecast bundle with days split on the calendar of `tz`.
pub fn forecast_bundle_in<Tz: TimeZone>(
    raw: &OwForecastResponse,
    tz: &Tz,
) -> Result<ForecastBundle, FetchError> {
    for entry in &raw.list {
        primary_condition(&entry.weather, "forecast entry")?;
    }

    let hourly = raw
        .list
        .iter()
        .take(HOURLY_POINTS)
        .map(hourly_point)
        .collect::<Result<Vec<_>, _>>()?;

    let mut days: BTreeMap<NaiveDate, Vec<&OwForecastEntry>> = BTreeMap::new();
    for entry in &raw.list {
        let at = unix_to_utc(entry.dt)?;
        days.entry(at.with_timezone(tz).date_naive())
            .or_default()
            .push(entry);
    }

    let daily = days
        .into_values()
        .take(DAILY_POINTS)
        .map(|items| daily_point(&items))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ForecastBundle { hourly, daily })
}

pub fn city_suggestions(raw: OwFindResponse) -> Vec<CitySuggestion> {
    raw.list
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|city| CitySuggestion {
            name: city.name,
            country: city.sys.country,
            lat: city.coord.lat,
            lon: city.coord.lon,
        })
        .collect()
}

fn hourly_point(entry: &OwForecastEntry) -> Result<HourlyPoint, FetchError> {
    let condition = primary_condition(&entry.weather, "forecast entry")?;

    Ok(HourlyPoint {
        time: unix_to_utc(entry.dt)?,
        temp: round_temp(entry.main.temp),
        feels_like: round_temp(entry.main.feels_like),
        humidity: entry.main.humidity,
        pressure: entry.main.pressure,
        wind_speed: entry.wind.speed,
        description: condition.description.clone(),
        icon: condition.icon.clone(),
        precipitation_probability: percent(entry.pop),
    })
}

/// `items` is never empty: groups are created on first insert.
fn daily_point(items: &[&OwForecastEntry]) -> Result<DailyPoint, FetchError> {
    let first = items
        .first()
        .ok_or_else(|| FetchError::MalformedResponse("empty forecast day".to_string()))?;

    let temp_min = items
        .iter()
        .map(|e| e.main.temp_min)
        .fold(f64::INFINITY, f64::min);
    let temp_max = items
        .iter()
        .map(|e| e.main.temp_max)
        .fold(f64::NEG_INFINITY, f64::max);

    // Sample the middle entry rather than averaging icons.
    let middle = items[items.len() / 2];
    let condition = primary_condition(&middle.weather, "forecast entry")?;

    Ok(DailyPoint {
        date: unix_to_utc(first.dt)?,
        temp_min: round_temp(temp_min),
        temp_max: round_temp(temp_max),
        icon: condition.icon.clone(),
        description: condition.description.clone(),
    })
}

fn primary_condition<'a>(
    weather: &'a [OwWeather],
    what: &str,
) -> Result<&'a OwWeather, FetchError> {
    weather
        .first()
        .ok_or_else(|| FetchError::MalformedResponse(format!("{what} has no weather conditions")))
}

/// Nearest integer, halves toward positive infinity.
fn round_temp(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn percent(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| FetchError::MalformedResponse(format!("timestamp {ts} out of range")))
}
