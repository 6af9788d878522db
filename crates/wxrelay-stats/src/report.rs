use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use wxrelay_core::{AppError, DatabaseError};
use wxrelay_store::WeatherStore;

use crate::aggregate::{self, LabelSighting, TemperatureFilter};
use crate::series::TemperatureSeries;

/// Listed when a stats request carries no parameters.
pub const VALID_QUERY_PARAMETERS: [&str; 3] = [
    "count=query|labels",
    "summary=day",
    "temp=lows|highs|avgs",
];

/// Parsed stats query. Keys may repeat; values are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRequest {
    pub query_count: bool,
    pub labels: bool,
    pub daily_summary: bool,
    pub temperatures: Vec<TemperatureFilter>,
}

impl StatsRequest {
    /// Parse raw query pairs.
    ///
    /// Unknown keys and unknown `count`/`summary` values are ignored. Any
    /// unknown `temp` value rejects the whole request.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();

        for (key, value) in pairs {
            let value = value.as_ref().trim().to_ascii_lowercase();
            match key.as_ref().trim().to_ascii_lowercase().as_str() {
                "count" => match value.as_str() {
                    "query" => request.query_count = true,
                    "labels" => request.labels = true,
                    _ => tracing::debug!("Ignoring count={}", value),
                },
                "summary" => {
                    if value == "day" {
                        request.daily_summary = true;
                    }
                }
                "temp" => {
                    let filter: TemperatureFilter = value.parse()?;
                    if !request.temperatures.contains(&filter) {
                        request.temperatures.push(filter);
                    }
                }
                _ => {}
            }
        }

        Ok(request)
    }

    fn needs_history(&self) -> bool {
        self.daily_summary || !self.temperatures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<CountReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperatures: Option<BTreeMap<String, TemperatureSeries>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_queries: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub daily: BTreeMap<String, Vec<LabelSighting>>,
}

/// Run every report the request names against the store.
pub fn build_report(store: &WeatherStore, request: &StatsRequest) -> Result<StatsReport, DatabaseError> {
    let mut report = StatsReport::default();

    if request.query_count || request.labels {
        let mut count = CountReport::default();
        if request.query_count {
            count.location_queries = Some(store.total_query_count()?);
        }
        if request.labels {
            count.labels = Some(aggregate::known_labels(store.label_history()?));
        }
        report.count = Some(count);
    }

    if !request.needs_history() {
        return Ok(report);
    }

    let history = store.reading_history()?;

    if request.daily_summary {
        report.summary = Some(SummaryReport {
            daily: aggregate::daily_summary(&history),
        });
    }

    if !request.temperatures.is_empty() {
        let temperatures = request
            .temperatures
            .iter()
            .map(|filter| {
                (
                    filter.as_str().to_string(),
                    aggregate::temperature_report(&history, *filter),
                )
            })
            .collect();
        report.temperatures = Some(temperatures);
    }

    Ok(report)
}
