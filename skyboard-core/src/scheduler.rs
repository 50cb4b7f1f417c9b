//! Periodic refresh of the cities a dashboard is looking at.
//!
//! A watch runs an initial pass over the cities that have not been fetched
//! recently, then refreshes every city on a fixed cadence until it is
//! stopped or replaced. Fetches for different cities in one pass run
//! concurrently and fail independently.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RefreshConfig,
    error::FetchError,
    model::{ForecastBundle, Units, WatchSet, WeatherSnapshot},
    provider::WeatherSource,
    registry::{DEFAULT_REFRESH_WINDOW, LastFetchedRegistry},
};

pub const DEFAULT_CADENCE: Duration = Duration::from_secs(60);

/// `tokio::time::interval` rejects a zero period.
const MIN_CADENCE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// A city fetched less than this long ago is skipped by the initial pass.
    pub refresh_window: Duration,
    /// Interval between unconditional passes.
    pub cadence: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_window: DEFAULT_REFRESH_WINDOW,
            cadence: DEFAULT_CADENCE,
        }
    }
}

impl From<&RefreshConfig> for SchedulerConfig {
    fn from(cfg: &RefreshConfig) -> Self {
        Self {
            refresh_window: cfg.refresh_window(),
            cadence: cfg.cadence(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    /// Run once when a watch starts.
    Initial,
    /// Run on every cadence tick.
    Scheduled,
}

/// What a watch reports back to its display.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Current {
        city: String,
        result: Result<Arc<WeatherSnapshot>, FetchError>,
    },
    Forecast {
        city: String,
        result: Result<Arc<ForecastBundle>, FetchError>,
    },
    /// Every city of the pass has reported.
    PassCompleted { trigger: PassTrigger, requested: usize },
}

/// Handle to a running watch. Dropping it stops the watch.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the watch and wait for its task to wind down.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "watch task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Drives refreshes for at most one watch set at a time.
#[derive(Debug)]
pub struct RefreshScheduler {
    refresher: Refresher,
    cadence: Duration,
    active: Mutex<Option<CancellationToken>>,
}

impl RefreshScheduler {
    /// Scheduler plus the receiving end of its event stream.
    pub fn new(
        source: Arc<dyn WeatherSource>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let registry = Arc::new(LastFetchedRegistry::new(config.refresh_window));
        Self::with_registry(source, registry, config.cadence)
    }

    /// Like [`RefreshScheduler::new`] but sharing an existing registry.
    pub fn with_registry(
        source: Arc<dyn WeatherSource>,
        registry: Arc<LastFetchedRegistry>,
        cadence: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            refresher: Refresher {
                source,
                registry,
                events,
            },
            cadence: cadence.max(MIN_CADENCE),
            active: Mutex::new(None),
        };
        (scheduler, rx)
    }

    pub fn registry(&self) -> &Arc<LastFetchedRegistry> {
        &self.refresher.registry
    }

    /// Start refreshing `watch`, replacing whatever was watched before.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_watching(&self, watch: WatchSet, units: Units) -> WatchHandle {
        let token = CancellationToken::new();
        if let Some(previous) = self.active.lock().replace(token.clone()) {
            previous.cancel();
        }

        tracing::info!(
            kind = ?watch.kind(),
            cities = watch.cities().len(),
            %units,
            "starting watch"
        );

        let task = tokio::spawn(run_watch(
            self.refresher.clone(),
            watch,
            units,
            self.cadence,
            token.clone(),
        ));

        WatchHandle {
            token,
            task: Some(task),
        }
    }

    /// Cancel the active watch, if any.
    pub fn stop_watching(&self) {
        if let Some(token) = self.active.lock().take() {
            token.cancel();
            tracing::info!("watch stopped");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(token) = self.active.get_mut().take() {
            token.cancel();
        }
    }
}

async fn run_watch(
    refresher: Refresher,
    watch: WatchSet,
    units: Units,
    cadence: Duration,
    token: CancellationToken,
) {
    let stale: Vec<String> = watch
        .cities()
        .iter()
        .filter(|city| refresher.registry.needs_refresh(city, units))
        .cloned()
        .collect();

    tokio::select! {
        _ = token.cancelled() => return,
        _ = refresher.run_pass(PassTrigger::Initial, &stale, units, watch.includes_forecast()) => {}
    }

    if watch.is_empty() {
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = refresher.run_pass(
                        PassTrigger::Scheduled,
                        watch.cities(),
                        units,
                        watch.includes_forecast(),
                    ) => {}
                }
            }
        }
    }

    tracing::debug!(kind = ?watch.kind(), "watch loop exited");
}

#[derive(Debug, Clone)]
struct Refresher {
    source: Arc<dyn WeatherSource>,
    registry: Arc<LastFetchedRegistry>,
    events: mpsc::UnboundedSender<RefreshEvent>,
}

impl Refresher {
    async fn run_pass(
        &self,
        trigger: PassTrigger,
        cities: &[String],
        units: Units,
        with_forecast: bool,
    ) {
        join_all(
            cities
                .iter()
                .map(|city| self.refresh_city(city, units, with_forecast)),
        )
        .await;

        tracing::debug!(?trigger, requested = cities.len(), "refresh pass complete");
        self.emit(RefreshEvent::PassCompleted {
            trigger,
            requested: cities.len(),
        });
    }

    async fn refresh_city(&self, city: &str, units: Units, with_forecast: bool) {
        let forecast = async {
            if with_forecast {
                Some(self.source.forecast(city, units).await)
            } else {
                None
            }
        };
        let (current, forecast) = futures::join!(self.source.current(city, units), forecast);

        match &current {
            Ok(_) => self.registry.record(city, units),
            Err(err) => tracing::warn!(city, error = %err, "current weather refresh failed"),
        }
        self.emit(RefreshEvent::Current {
            city: city.to_string(),
            result: current,
        });

        if let Some(result) = forecast {
            if let Err(err) = &result {
                tracing::warn!(city, error = %err, "forecast refresh failed");
            }
            self.emit(RefreshEvent::Forecast {
                city: city.to_string(),
                result,
            });
        }
    }

    fn emit(&self, event: RefreshEvent) {
        // A closed receiver just means nobody is displaying anymore.
        let _ = self.events.send(event);
    }
}
