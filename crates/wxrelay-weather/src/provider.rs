//! Provider Gateway: current conditions from an OpenWeather-compatible API.

use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

use wxrelay_core::error::ReqwestErrorExt;
use wxrelay_core::{ProviderConfig, ProviderError};

use crate::types::{CurrentWeatherResponse, ProviderReading};

/// Source of current weather for a city.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    /// Fetch current conditions. A non-200 provider status is an error.
    async fn fetch_current(&self, city_name: &str) -> Result<ProviderReading, ProviderError>;
}

pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ReqwestErrorExt::into_provider_error)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn new_with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WeatherGateway for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_current(&self, city_name: &str) -> Result<ProviderReading, ProviderError> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city_name), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_provider_error)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_provider_error)?;

        // Error bodies carry `cod` and `message` too, so decode regardless of status.
        match serde_json::from_slice::<CurrentWeatherResponse>(&body) {
            Ok(decoded) => decoded.into_reading(),
            Err(e) if status.is_success() => Err(ProviderError::InvalidResponse(e.to_string())),
            Err(_) => {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                tracing::warn!("Provider returned HTTP {} with undecodable body", status);
                Err(ProviderError::Http {
                    status: status.as_u16(),
                    message: if text.is_empty() {
                        status.to_string()
                    } else {
                        text
                    },
                })
            }
        }
    }
}
