//! When each city last had its current weather fetched successfully.

use std::{collections::HashMap, time::Duration};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::model::Units;

/// Default window inside which a repeat fetch for a city is suppressed.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct LastFetch {
    at: Instant,
    units: Units,
}

/// City name to instant of the last successful current-weather fetch.
///
/// Independent of the response cache TTL: this only decides whether a
/// watch needs to ask for a city at all when it starts.
#[derive(Debug)]
pub struct LastFetchedRegistry {
    window: Duration,
    entries: Mutex<HashMap<String, LastFetch>>,
}

impl LastFetchedRegistry {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn record(&self, city: &str, units: Units) {
        let entry = LastFetch {
            at: Instant::now(),
            units,
        };
        self.entries.lock().insert(city.to_string(), entry);
    }

    pub fn last_fetched(&self, city: &str) -> Option<Instant> {
        self.entries.lock().get(city).map(|e| e.at)
    }

    /// True when the city was never fetched, was fetched in other units,
    /// or was fetched longer ago than the window.
    pub fn needs_refresh(&self, city: &str, units: Units) -> bool {
        match self.entries.lock().get(city) {
            Some(last) => last.units != units || last.at.elapsed() > self.window,
            None => true,
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LastFetchedRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unknown_city_needs_refresh() {
        let registry = LastFetchedRegistry::default();
        assert_eq!(registry.window(), DEFAULT_REFRESH_WINDOW);
        assert!(registry.needs_refresh("Paris", Units::Metric));
        assert!(registry.last_fetched("Paris").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn recent_fetch_is_suppressed_until_window_passes() {
        let registry = LastFetchedRegistry::default();
        registry.record("Paris", Units::Metric);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!registry.needs_refresh("Paris", Units::Metric));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(registry.needs_refresh("Paris", Units::Metric));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_in_other_units_does_not_count() {
        let registry = LastFetchedRegistry::default();
        registry.record("Paris", Units::Metric);

        assert!(registry.needs_refresh("Paris", Units::Imperial));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forgets_everything() {
        let registry = LastFetchedRegistry::default();
        registry.record("Paris", Units::Metric);
        registry.clear();

        assert!(registry.needs_refresh("Paris", Units::Metric));
    }
}
