//! Folds over reading history. Rows without a city name are skipped
//! everywhere.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use wxrelay_core::AppError;
use wxrelay_store::HistoryRow;

use crate::series::TemperatureSeries;

/// Which temperature report to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemperatureFilter {
    Lows,
    Highs,
    Averages,
}

impl TemperatureFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureFilter::Lows => "lows",
            TemperatureFilter::Highs => "highs",
            TemperatureFilter::Averages => "avgs",
        }
    }
}

impl fmt::Display for TemperatureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lows" => Ok(TemperatureFilter::Lows),
            "highs" => Ok(TemperatureFilter::Highs),
            "avgs" => Ok(TemperatureFilter::Averages),
            _ => Err(AppError::invalid_filter(s)),
        }
    }
}

/// One occurrence of a label in the daily summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSighting {
    pub city_name: String,
    pub date: DateTime<Utc>,
}

/// Distinct labels in order of first appearance.
pub fn known_labels<I, L>(label_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for list in label_lists {
        for label in list {
            if seen.insert(label.clone()) {
                labels.push(label);
            }
        }
    }

    labels
}

/// label → sightings, each list in history order (newest first).
pub fn daily_summary(rows: &[HistoryRow]) -> BTreeMap<String, Vec<LabelSighting>> {
    let mut summary: BTreeMap<String, Vec<LabelSighting>> = BTreeMap::new();

    for row in rows {
        let Some(city) = row.city_name.as_deref() else {
            continue;
        };

        for label in &row.labels {
            summary.entry(label.clone()).or_default().push(LabelSighting {
                city_name: city.to_string(),
                date: row.at_time,
            });
        }
    }

    summary
}

/// Build the series a filter asks for.
pub fn temperature_report(rows: &[HistoryRow], filter: TemperatureFilter) -> TemperatureSeries {
    match filter {
        TemperatureFilter::Lows => column_series(rows, |row| row.temp_low),
        TemperatureFilter::Highs => column_series(rows, |row| row.temp_high),
        TemperatureFilter::Averages => monthly_averages(rows),
    }
}

/// Bucket one temperature column by date. Null temperatures add nothing.
pub fn column_series<F>(rows: &[HistoryRow], column: F) -> TemperatureSeries
where
    F: Fn(&HistoryRow) -> Option<f64>,
{
    let mut series = TemperatureSeries::new();

    for row in rows {
        let (Some(city), Some(temp)) = (row.city_name.as_deref(), column(row)) else {
            continue;
        };
        let date = row.at_time.date_naive();
        series.add(temp, city, date.year(), date.month(), date.day());
    }

    series
}

/// Per-reading `(low + high) / 2`, bucketed by day.
/// Readings missing either bound are skipped.
pub fn daily_midpoints(rows: &[HistoryRow]) -> TemperatureSeries {
    column_series(rows, |row| match (row.temp_low, row.temp_high) {
        (Some(low), Some(high)) => Some((low + high) / 2.0),
        _ => None,
    })
}

/// Mean of each day's mean, per month, stored under day `0`.
pub fn monthly_means(daily: &TemperatureSeries) -> TemperatureSeries {
    let mut monthly = TemperatureSeries::new();

    for (city, years) in daily.cities() {
        for (year, months) in years {
            for (month, days) in months {
                let day_means: Vec<f64> = days
                    .values()
                    .filter(|samples| !samples.is_empty())
                    .map(|samples| mean(samples))
                    .collect();

                if day_means.is_empty() {
                    continue;
                }
                monthly.add(mean(&day_means), city, *year, *month, 0);
            }
        }
    }

    monthly
}

pub fn monthly_averages(rows: &[HistoryRow]) -> TemperatureSeries {
    monthly_means(&daily_midpoints(rows))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
