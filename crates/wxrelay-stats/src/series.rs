//! Temperature samples bucketed by city, year, month and day.

use serde::Serialize;
use std::collections::BTreeMap;

pub type DayBuckets = BTreeMap<u32, Vec<f64>>;
pub type MonthBuckets = BTreeMap<u32, DayBuckets>;
pub type YearBuckets = BTreeMap<i32, MonthBuckets>;

/// city → year → month → day → samples.
///
/// Serializes as nested JSON objects with stringified numeric keys.
/// A day bucket is only created together with its first sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemperatureSeries(BTreeMap<String, YearBuckets>);

impl TemperatureSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the bucket for the given date exists and return it.
    /// Existing buckets and their samples are left as they are.
    pub fn ensure_path(&mut self, city: &str, year: i32, month: u32, day: u32) -> &mut Vec<f64> {
        self.0
            .entry(city.to_string())
            .or_default()
            .entry(year)
            .or_default()
            .entry(month)
            .or_default()
            .entry(day)
            .or_default()
    }

    pub fn add(&mut self, sample: f64, city: &str, year: i32, month: u32, day: u32) {
        self.ensure_path(city, year, month, day).push(sample);
    }

    pub fn samples(&self, city: &str, year: i32, month: u32, day: u32) -> Option<&[f64]> {
        self.0
            .get(city)?
            .get(&year)?
            .get(&month)?
            .get(&day)
            .map(Vec::as_slice)
    }

    pub fn cities(&self) -> impl Iterator<Item = (&String, &YearBuckets)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
