use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wxrelay_core::ProviderError;
use wxrelay_store::LocationWeather;

/// Status code in a provider body. Success bodies carry a number, error
/// bodies usually a string such as `"404"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Number(i64),
    Text(String),
}

impl ResponseCode {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ResponseCode::Number(n) => Some(*n),
            ResponseCode::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Current-weather body from an OpenWeather-compatible provider.
/// Only the fields the relay reads are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherResponse {
    #[serde(default)]
    pub cod: Option<ResponseCode>,
    #[serde(default)]
    pub main: Option<MainBlock>,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    pub temp_min: f64,
    pub temp_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub main: String,
}

/// A successful provider answer, reduced to what gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReading {
    pub labels: Vec<String>,
    pub temp_min: f64,
    pub temp_max: f64,
}

impl CurrentWeatherResponse {
    /// Convert into a reading, or the provider's failure.
    ///
    /// Anything but `cod == 200` is a failure; a missing code counts as one.
    pub fn into_reading(self) -> Result<ProviderReading, ProviderError> {
        let code = self.cod.as_ref().and_then(ResponseCode::as_i64).unwrap_or(0);
        if code != 200 {
            return Err(ProviderError::unsuccessful(code, self.message));
        }

        let main = self
            .main
            .ok_or_else(|| ProviderError::InvalidResponse("missing main block".into()))?;

        let labels = self
            .weather
            .into_iter()
            .map(|w| w.main)
            .filter(|label| !label.is_empty())
            .collect();

        Ok(ProviderReading {
            labels,
            temp_min: main.temp_min,
            temp_max: main.temp_max,
        })
    }
}

/// Weather response returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub city_name: String,
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_temp: Option<f64>,
    pub at_time: DateTime<Utc>,
}

impl From<&LocationWeather> for WeatherSummary {
    fn from(row: &LocationWeather) -> Self {
        let reading = &row.reading;
        // Midpoint of low and high, not a true median.
        let median_temp = match (reading.temp_low, reading.temp_high) {
            (Some(low), Some(high)) => Some((low + high) / 2.0),
            _ => None,
        };

        Self {
            city_name: row.location.city_name.clone(),
            conditions: reading.labels.clone(),
            low_temp: reading.temp_low,
            high_temp: reading.temp_high,
            median_temp,
            at_time: reading.at_time,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wxrelay_store::{LocationRow, WeatherRow};

    #[test]
    fn test_success_body_with_numeric_code() {
        let body = r#"{
            "cod": 200,
            "name": "Reno",
            "main": {"temp": 276.1, "temp_min": 274.0, "temp_max": 278.0},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}]
        }"#;
        let parsed: CurrentWeatherResponse = serde_json::from_str(body).unwrap();
        let reading = parsed.into_reading().unwrap();

        assert_eq!(reading.labels, vec!["Clear"]);
        assert_eq!(reading.temp_min, 274.0);
        assert_eq!(reading.temp_max, 278.0);
    }

    #[test]
    fn test_error_body_with_string_code() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let parsed: CurrentWeatherResponse = serde_json::from_str(body).unwrap();

        match parsed.into_reading() {
            Err(ProviderError::Unsuccessful { code, message }) => {
                assert_eq!(code, 404);
                assert_eq!(message, "city not found");
            }
            other => panic!("expected unsuccessful, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_code_uses_unknown_reason() {
        let parsed: CurrentWeatherResponse = serde_json::from_str("{}").unwrap();
        let err = parsed.into_reading().unwrap_err();
        assert_eq!(err.to_string(), wxrelay_core::error::PROVIDER_UNKNOWN_REASON);
    }

    #[test]
    fn test_success_without_main_is_invalid() {
        let parsed: CurrentWeatherResponse =
            serde_json::from_str(r#"{"cod": 200, "weather": []}"#).unwrap();
        assert!(matches!(
            parsed.into_reading(),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_summary_median_is_midpoint() {
        let row = LocationWeather {
            location: LocationRow {
                id: 1,
                city_name: "Reno".into(),
                query_count: 1,
            },
            reading: WeatherRow {
                location_id: 1,
                labels: vec!["Clear".into()],
                temp_high: Some(278.0),
                temp_low: Some(274.0),
                at_time: Utc::now(),
            },
        };

        let summary = WeatherSummary::from(&row);
        assert_eq!(summary.median_temp, Some(276.0));
        assert_eq!(summary.conditions, vec!["Clear"]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["city_name"], "Reno");
        assert_eq!(json["low_temp"], 274.0);
    }
}
