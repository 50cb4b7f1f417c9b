use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    cache::{CacheKey, DEFAULT_TTL, ResponseCache},
    config::{Config, DEFAULT_BASE_URL},
    error::FetchError,
    model::{CitySuggestion, ForecastBundle, Units, WeatherSnapshot},
    transform::{self, OwCurrentResponse, OwFindResponse, OwForecastResponse},
};

use super::WeatherSource;

/// Connection and caching settings for [`OpenWeatherClient`].
#[derive(Clone)]
pub struct OpenWeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl OpenWeatherConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: DEFAULT_TTL,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.api_key()?)
            .with_base_url(config.provider.base_url.clone())
            .with_timeout(config.provider.timeout())
            .with_cache_ttl(config.refresh.cache_ttl()))
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl fmt::Debug for OpenWeatherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

/// OpenWeather client with a response cache in front of the current and
/// forecast endpoints. City search always goes to the network.
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
    current: ResponseCache<WeatherSnapshot>,
    forecast: ResponseCache<ForecastBundle>,
}

impl OpenWeatherClient {
    pub fn new(config: OpenWeatherConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            current: ResponseCache::new(config.cache_ttl),
            forecast: ResponseCache::new(config.cache_ttl),
        })
    }

    pub async fn fetch_current(
        &self,
        city: &str,
        units: Units,
    ) -> Result<Arc<WeatherSnapshot>, FetchError> {
        let city = city.trim();
        let key = CacheKey::current(city, units);

        self.current
            .get_or_fetch(key.clone(), async {
                tracing::info!(%key, "requesting current weather");
                let raw: OwCurrentResponse = self
                    .get_json("weather", &[("q", city), ("units", units.as_str())])
                    .await?;
                transform::current_snapshot(raw)
            })
            .await
            .inspect_err(|err| tracing::warn!(%key, error = %err, "current weather failed"))
    }

    pub async fn fetch_forecast(
        &self,
        city: &str,
        units: Units,
    ) -> Result<Arc<ForecastBundle>, FetchError> {
        let city = city.trim();
        let key = CacheKey::forecast(city, units);

        self.forecast
            .get_or_fetch(key.clone(), async {
                tracing::info!(%key, "requesting forecast");
                let raw: OwForecastResponse = self
                    .get_json("forecast", &[("q", city), ("units", units.as_str())])
                    .await?;
                transform::forecast_bundle(&raw)
            })
            .await
            .inspect_err(|err| tracing::warn!(%key, error = %err, "forecast failed"))
    }

    /// Up to five fuzzy matches, most populous first. Blank queries never
    /// reach the network.
    pub async fn search_cities(&self, query: &str) -> Result<Vec<CitySuggestion>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(query, "searching cities");
        let raw: OwFindResponse = self
            .get_json(
                "find",
                &[
                    ("q", query),
                    ("type", "like"),
                    ("sort", "population"),
                    ("cnt", "5"),
                ],
            )
            .await?;

        Ok(transform::city_suggestions(raw))
    }

    /// Current weather if it is cached and fresh; never hits the network.
    pub async fn cached_current(&self, city: &str, units: Units) -> Option<Arc<WeatherSnapshot>> {
        self.current.get(&CacheKey::current(city.trim(), units)).await
    }

    /// Forecast if it is cached and fresh; never hits the network.
    pub async fn cached_forecast(&self, city: &str, units: Units) -> Option<Arc<ForecastBundle>> {
        self.forecast.get(&CacheKey::forecast(city.trim(), units)).await
    }

    pub fn clear_cache(&self) {
        self.current.invalidate_all();
        self.forecast.invalidate_all();
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("current", &self.current)
            .field("forecast", &self.forecast)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, city: &str, units: Units) -> Result<Arc<WeatherSnapshot>, FetchError> {
        self.fetch_current(city, units).await
    }

    async fn forecast(&self, city: &str, units: Units) -> Result<Arc<ForecastBundle>, FetchError> {
        self.fetch_forecast(city, units).await
    }

    async fn search(&self, query: &str) -> Result<Vec<CitySuggestion>, FetchError> {
        self.search_cities(query).await
    }
}

/// OpenWeather error bodies look like `{"cod":"404","message":"city not found"}`.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<OwErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| truncate_body(body))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
