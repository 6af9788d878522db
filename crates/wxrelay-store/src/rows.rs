//! Typed rows returned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row in the `locations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub id: i64,
    pub city_name: String,
    pub query_count: i64,
}

/// A row in the append-only `weather` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    pub location_id: i64,
    pub labels: Vec<String>,
    pub temp_high: Option<f64>,
    pub temp_low: Option<f64>,
    pub at_time: DateTime<Utc>,
}

/// A location joined with its most recent reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeather {
    pub location: LocationRow,
    pub reading: WeatherRow,
}

/// One reading joined with the name of its location, as read for statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub city_name: Option<String>,
    pub at_time: DateTime<Utc>,
    pub labels: Vec<String>,
    pub temp_low: Option<f64>,
    pub temp_high: Option<f64>,
}

/// A row in the `accounts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
}

/// A row in the `bookmarks` table. Shares its id with the owning account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRow {
    pub id: i64,
    pub location_ids: Vec<i64>,
}
