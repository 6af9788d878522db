//! Relational storage for wxrelay.
//!
//! `WeatherStore` owns a single SQLite connection. It is the Reading Store
//! (locations plus their append-only weather readings) and also holds the
//! account and bookmark tables. Callers share it as
//! `Arc<parking_lot::Mutex<WeatherStore>>`.

pub mod accounts;
pub mod rows;
pub mod store;

pub use rows::{AccountRow, BookmarkRow, HistoryRow, LocationRow, LocationWeather, WeatherRow};
pub use store::{format_timestamp, WeatherStore};

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Open the store, retrying while the file cannot be opened.
///
/// Makes `attempts` tries (at least one), sleeping `interval` between them.
pub fn open_with_retry(path: &Path, attempts: u32, interval: Duration) -> Result<WeatherStore> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match WeatherStore::open(path) {
            Ok(store) => {
                tracing::info!("Weather store opened at {}", path.display());
                return Ok(store);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Store open attempt {}/{} failed: {}",
                    attempt,
                    attempts,
                    e
                );
                attempt += 1;
                std::thread::sleep(interval);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to open weather store at {} after {} attempts",
                        path.display(),
                        attempts
                    )
                });
            }
        }
    }
}
