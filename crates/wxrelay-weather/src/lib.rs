//! Weather lookups for wxrelay.
//!
//! Wraps an OpenWeather-compatible provider behind [`WeatherGateway`] and
//! serves readings through [`WeatherService`], which caches them in the
//! SQLite store for a minute.

pub mod provider;
pub mod service;
pub mod types;

pub use provider::{OpenWeatherClient, WeatherGateway};
pub use service::{is_fresh, normalize_city_name, CacheLookup, WeatherService, CACHE_TTL_SECS};
pub use types::{ProviderReading, WeatherSummary};
