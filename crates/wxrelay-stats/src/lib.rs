//! Aggregation Engine: statistics folded from stored weather history.
//!
//! Every report is built fresh from a full scan of the store; nothing here
//! writes.

pub mod aggregate;
pub mod report;
pub mod series;

pub use aggregate::{LabelSighting, TemperatureFilter};
pub use report::{build_report, CountReport, StatsReport, StatsRequest, SummaryReport, VALID_QUERY_PARAMETERS};
pub use series::TemperatureSeries;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::instrument;

use wxrelay_core::AppError;
use wxrelay_store::WeatherStore;

/// Builds stats reports off the request path's async runtime.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<Mutex<WeatherStore>>,
}

impl StatsService {
    pub fn new(store: Arc<Mutex<WeatherStore>>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), level = "info")]
    pub async fn report(&self, request: StatsRequest) -> Result<StatsReport, AppError> {
        let store = Arc::clone(&self.store);

        let report = tokio::task::spawn_blocking(move || {
            let store = store.lock();
            build_report(&store, &request)
        })
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!("stats task failed: {}", e)))??;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_report_through_service() {
        let store = Arc::new(Mutex::new(WeatherStore::open_in_memory().unwrap()));
        store
            .lock()
            .record_reading("Reno", 274.0, 278.0, &["Clear".to_string()], Utc::now())
            .unwrap();

        let service = StatsService::new(Arc::clone(&store));
        let request = StatsRequest::from_pairs([("count", "query")]).unwrap();
        let report = service.report(request).await.unwrap();

        assert_eq!(report.count.unwrap().location_queries, Some(1));
        assert!(report.temperatures.is_none());
    }
}
