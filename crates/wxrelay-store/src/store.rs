//! SQLite-backed Reading Store.
//!
//! Locations are keyed by their (title-cased) city name. Readings are never
//! updated: a refresh appends a row, and the current reading of a location is
//! the one with the greatest `at_time` for that location.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use wxrelay_core::DatabaseError;

use crate::rows::{HistoryRow, LocationRow, LocationWeather, WeatherRow};

const SCHEMA_VERSION: i32 = 1;

const LATEST_FOR_CITY_SQL: &str = "
    SELECT l.id, l.city_name, l.query_count,
           w.location_id, w.labels, w.temp_high, w.temp_low, w.at_time
    FROM locations l
    JOIN weather w ON w.location_id = l.id
    WHERE l.city_name = ?1
      AND w.at_time = (SELECT MAX(at_time) FROM weather WHERE location_id = l.id)
    ORDER BY w.id DESC
    LIMIT 1";

const UPSERT_LOCATION_SQL: &str = "
    INSERT INTO locations (city_name, query_count)
        VALUES (?1, 1)
    ON CONFLICT (city_name) DO UPDATE
        SET query_count = locations.query_count + 1
    RETURNING id, city_name, query_count";

const INSERT_READING_SQL: &str = "
    INSERT INTO weather (location_id, labels, temp_low, temp_high, at_time)
        VALUES (?1, ?2, ?3, ?4, ?5)
    RETURNING location_id, labels, temp_high, temp_low, at_time";

/// SQLite storage for locations, readings, accounts and bookmarks.
#[derive(Debug)]
pub struct WeatherStore {
    pub(crate) conn: Connection,
}

impl WeatherStore {
    /// Open or create the database at `path`.
    ///
    /// Creates missing parent directories and the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store. Used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn =
            Connection::open_in_memory().map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);

                CREATE TABLE IF NOT EXISTS locations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    city_name TEXT UNIQUE,
                    query_count INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS weather (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    location_id INTEGER REFERENCES locations(id),
                    labels TEXT NOT NULL DEFAULT '[]',
                    temp_high REAL,
                    temp_low REAL,
                    at_time TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS accounts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS bookmarks (
                    id INTEGER PRIMARY KEY REFERENCES accounts(id),
                    location_ids TEXT NOT NULL DEFAULT '[]'
                );

                CREATE INDEX IF NOT EXISTS idx_weather_location_time ON weather(location_id, at_time);
                CREATE INDEX IF NOT EXISTS idx_weather_time ON weather(at_time);
                "#,
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;

        match version {
            None => {
                self.conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(DatabaseError::MigrationFailed(format!(
                    "database schema v{} is newer than supported v{}",
                    v, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Look up a location and its most recent reading.
    ///
    /// Returns `None` when the city is unknown or has no readings.
    pub fn latest_for_city(&self, city_name: &str) -> Result<Option<LocationWeather>, DatabaseError> {
        let found = self
            .conn
            .query_row(LATEST_FOR_CITY_SQL, params![city_name], |row| {
                Ok(LocationWeather {
                    location: LocationRow {
                        id: row.get(0)?,
                        city_name: row.get(1)?,
                        query_count: row.get(2)?,
                    },
                    reading: weather_from_row(row, 3)?,
                })
            })
            .optional()?;

        Ok(found)
    }

    /// Bump a location's query counter by one and return the new value.
    pub fn increment_query_count(&self, location_id: i64) -> Result<i64, DatabaseError> {
        let count = self.conn.query_row(
            "UPDATE locations SET query_count = query_count + 1 WHERE id = ?1 RETURNING query_count",
            params![location_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Upsert the location and append a reading in one transaction.
    ///
    /// A new location starts with a query count of 1; an existing one is
    /// incremented. Nothing is visible unless both statements succeed.
    pub fn record_reading(
        &mut self,
        city_name: &str,
        temp_min: f64,
        temp_max: f64,
        labels: &[String],
        at_time: DateTime<Utc>,
    ) -> Result<LocationWeather, DatabaseError> {
        let labels_json = serde_json::to_string(labels)
            .map_err(|e| DatabaseError::QueryFailed(format!("cannot encode labels: {}", e)))?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let location = tx.query_row(UPSERT_LOCATION_SQL, params![city_name], |row| {
            Ok(LocationRow {
                id: row.get(0)?,
                city_name: row.get(1)?,
                query_count: row.get(2)?,
            })
        })?;

        let reading = tx.query_row(
            INSERT_READING_SQL,
            params![
                location.id,
                labels_json,
                temp_min,
                temp_max,
                format_timestamp(at_time)
            ],
            |row| weather_from_row(row, 0),
        )?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(
            city = %location.city_name,
            query_count = location.query_count,
            "Recorded weather reading"
        );

        Ok(LocationWeather { location, reading })
    }

    /// Sum of every named location's query counter. Zero when empty.
    pub fn total_query_count(&self) -> Result<i64, DatabaseError> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(query_count), 0) FROM locations WHERE city_name IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Label lists of every reading, in insertion order.
    pub fn label_history(&self) -> Result<Vec<Vec<String>>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT labels FROM weather WHERE location_id IS NOT NULL ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| labels_from_json(row, 0))?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every reading joined with its location name, newest first.
    ///
    /// Rows with a null city name are included; the aggregation decides
    /// what to do with them.
    pub fn reading_history(&self) -> Result<Vec<HistoryRow>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT l.city_name, w.at_time, w.labels, w.temp_low, w.temp_high
             FROM weather w
             JOIN locations l ON l.id = w.location_id
             ORDER BY w.at_time DESC, w.id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(HistoryRow {
                city_name: row.get(0)?,
                at_time: timestamp_from_row(row, 1)?,
                labels: labels_from_json(row, 2)?,
                temp_low: row.get(3)?,
                temp_high: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Fixed-width RFC 3339 so that text order matches time order in SQL.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn weather_from_row(row: &Row, offset: usize) -> rusqlite::Result<WeatherRow> {
    Ok(WeatherRow {
        location_id: row.get(offset)?,
        labels: labels_from_json(row, offset + 1)?,
        temp_high: row.get(offset + 2)?,
        temp_low: row.get(offset + 3)?,
        at_time: timestamp_from_row(row, offset + 4)?,
    })
}

fn timestamp_from_row(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn labels_from_json(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
