//! Core library for the `skyboard` weather dashboard.
//!
//! This crate defines:
//! - Shared domain models (snapshots, forecasts, watch sets)
//! - Transformation of raw OpenWeather payloads
//! - A TTL response cache and the caching OpenWeather client
//! - The refresh scheduler that keeps watched cities up to date
//! - Configuration & credentials handling
//!
//! It is used by `skyboard-cli`, but can also back other front ends.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod transform;

pub use cache::{CacheKey, ResponseCache};
pub use config::Config;
pub use error::FetchError;
pub use model::{
    CitySuggestion, DailyPoint, ForecastBundle, HourlyPoint, Units, WatchKind, WatchSet,
    WeatherSnapshot,
};
pub use provider::{OpenWeatherClient, OpenWeatherConfig, WeatherSource};
pub use registry::LastFetchedRegistry;
pub use scheduler::{PassTrigger, RefreshEvent, RefreshScheduler, SchedulerConfig, WatchHandle};
