use parking_lot::Mutex;
use std::sync::Arc;

use wxrelay_core::{AppError, DatabaseError};
use wxrelay_stats::StatsService;
use wxrelay_store::WeatherStore;
use wxrelay_weather::{WeatherGateway, WeatherService};

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherService>,
    pub stats: StatsService,
    store: Arc<Mutex<WeatherStore>>,
}

impl AppState {
    pub fn new(store: Arc<Mutex<WeatherStore>>, gateway: Arc<dyn WeatherGateway>) -> Self {
        Self {
            weather: Arc::new(WeatherService::new(Arc::clone(&store), gateway)),
            stats: StatsService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Run a store operation on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
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
