use crate::{
    error::FetchError,
    model::{CitySuggestion, ForecastBundle, Units, WeatherSnapshot},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

pub use openweather::{OpenWeatherClient, OpenWeatherConfig};

/// Anything that can answer the dashboard's three questions.
///
/// The refresh scheduler only talks to this trait, so tests can drive it
/// with an in-memory source.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current(&self, city: &str, units: Units) -> Result<Arc<WeatherSnapshot>, FetchError>;

    async fn forecast(&self, city: &str, units: Units) -> Result<Arc<ForecastBundle>, FetchError>;

    async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, FetchError>;
}
