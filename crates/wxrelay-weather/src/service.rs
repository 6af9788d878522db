//! Freshness Cache and Refresh Pipeline.
//!
//! `get_weather` serves a location's latest reading while it is younger than
//! [`CACHE_TTL_SECS`], otherwise fetches from the gateway and appends a new
//! reading. Refreshes of one city are serialized so that concurrent stale
//! requests produce a single provider call.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use wxrelay_core::{AppError, DatabaseError};
use wxrelay_store::{LocationWeather, WeatherStore};

use crate::provider::WeatherGateway;
use crate::types::WeatherSummary;

/// How long a stored reading is served without asking the provider.
pub const CACHE_TTL_SECS: i64 = 60;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Outcome of a freshness lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Young enough to serve. The query counter has already been bumped.
    Fresh(LocationWeather),
    Stale(LocationWeather),
    Missing,
}

/// Title-case a city name: first letter of every word upper, the rest lower.
/// Runs of whitespace collapse to one space.
pub fn normalize_city_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut word_start = true;

    for c in collapsed.chars() {
        if c.is_alphanumeric() || c == '_' {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }

    out
}

/// Whether a reading taken at `at_time` may still be served at `now`.
pub fn is_fresh(at_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(at_time) < Duration::seconds(CACHE_TTL_SECS)
}

pub struct WeatherService {
    store: Arc<Mutex<WeatherStore>>,
    gateway: Arc<dyn WeatherGateway>,
    clock: Clock,
    refresh_locks: RefreshLocks,
}

impl WeatherService {
    pub fn new(store: Arc<Mutex<WeatherStore>>, gateway: Arc<dyn WeatherGateway>) -> Self {
        Self {
            store,
            gateway,
            clock: Arc::new(Utc::now),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Current weather for a city, from cache or the provider.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather(&self, city_name: &str) -> Result<WeatherSummary, AppError> {
        let name = normalize_city_name(city_name);
        if name.is_empty() {
            return Err(AppError::invalid_request("a city name is required"));
        }

        if let CacheLookup::Fresh(found) = self.lookup(&name).await? {
            tracing::debug!(city = %name, "Serving cached reading");
            return Ok(WeatherSummary::from(&found));
        }

        let slot = self.refresh_slot(&name);
        let _guard = slot.lock.lock().await;
        // Another request may have refreshed while we waited.
        let found = match self.lookup(&name).await? {
            CacheLookup::Fresh(found) => {
                tracing::debug!(city = %name, "Reading refreshed by a concurrent request");
                found
            }
            CacheLookup::Stale(_) | CacheLookup::Missing => self.refresh(&name).await?,
        };

        Ok(WeatherSummary::from(&found))
    }

    /// Latest stored reading for a city and whether it is still fresh.
    ///
    /// A fresh hit increments the location's query counter before returning.
    #[instrument(skip(self), level = "debug")]
    pub async fn lookup(&self, city_name: &str) -> Result<CacheLookup, AppError> {
        let name = normalize_city_name(city_name);
        let now = (self.clock)();

        self.with_store(move |store| {
            let Some(mut found) = store.latest_for_city(&name)? else {
                return Ok(CacheLookup::Missing);
            };

            if is_fresh(found.reading.at_time, now) {
                found.location.query_count = store.increment_query_count(found.location.id)?;
                Ok(CacheLookup::Fresh(found))
            } else {
                Ok(CacheLookup::Stale(found))
            }
        })
        .await
    }

    /// Fetch from the provider and persist the result.
    ///
    /// A provider failure writes nothing.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh(&self, city_name: &str) -> Result<LocationWeather, AppError> {
        let name = normalize_city_name(city_name);
        let reading = self.gateway.fetch_current(&name).await?;
        let at_time = (self.clock)();

        let written = self
            .with_store(move |store| {
                store.record_reading(
                    &name,
                    reading.temp_min,
                    reading.temp_max,
                    &reading.labels,
                    at_time,
                )
            })
            .await?;

        tracing::info!(
            city = %written.location.city_name,
            query_count = written.location.query_count,
            "Refreshed weather from provider"
        );
        Ok(written)
    }

    fn refresh_slot(&self, name: &str) -> RefreshSlot<'_> {
        let mut locks = self.refresh_locks.lock();
        let lock = Arc::clone(locks.entry(name.to_string()).or_default());
        RefreshSlot {
            locks: &self.refresh_locks,
            name: name.to_string(),
            lock,
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut WeatherStore) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = store.lock();
            f(&mut *guard)
        })
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!("store task failed: {}", e)))?;

        Ok(result?)
    }
}

type RefreshLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A caller's claim on a city's refresh lock.
///
/// Dropping it, including when the request future is cancelled, removes the
/// map entry once no other caller holds the lock.
struct RefreshSlot<'a> {
    locks: &'a RefreshLocks,
    name: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for RefreshSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // Clones are only taken under the map lock, so the count cannot grow
        // while we check it.
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.name);
        }
    }
}
