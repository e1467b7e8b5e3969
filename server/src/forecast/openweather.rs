use super::types::*;
use super::{init_geocode_cache, GeocodeCache, WeatherGateway};
use crate::config::Config;
use crate::utils::{geocode_cache_key, validate_coordinates};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("No place found for \"{0}\"")]
    NotFound(String),
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
    geocode_cache: GeocodeCache,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("WeatherNow/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            geocode_cache: init_geocode_cache(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.openweather_base_url, path)
    }

    async fn by_coordinates(&self, path: &str, lat: f64, lon: f64) -> Result<Value, OpenWeatherError> {
        validate_coordinates(lat, lon).map_err(OpenWeatherError::InvalidCoordinates)?;

        self.make_request(
            &self.url(path),
            &[
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
                ("units", "metric"),
                ("appid", &self.config.openweather_api_key),
            ],
        )
        .await
    }

    async fn make_request(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, OpenWeatherError> {
        let response = self.client.get(url).query(params).send().await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let json: Value = response.json().await?;
                Ok(json)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("OpenWeather returned {} for {}", status, url);
                Err(OpenWeatherError::ApiError {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl WeatherGateway for OpenWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError> {
        self.by_coordinates(&self.config.openweather_current_path, lat, lon)
            .await
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError> {
        self.by_coordinates(&self.config.openweather_forecast_path, lat, lon)
            .await
    }

    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodeResponse>, OpenWeatherError> {
        let key = geocode_cache_key(query, limit);
        if let Some(hit) = self.geocode_cache.get(&key).await {
            tracing::debug!("Geocode cache hit for {:?}", query);
            return Ok(hit);
        }

        let response = self
            .make_request(
                &self.url(&self.config.openweather_geocode_direct_path),
                &[
                    ("q", query),
                    ("limit", &limit.to_string()),
                    ("appid", &self.config.openweather_api_key),
                ],
            )
            .await?;

        let places: Vec<GeocodeResponse> = serde_json::from_value(response)?;
        // Only hits are cached
        if !places.is_empty() {
            self.geocode_cache.insert(key, places.clone()).await;
        }
        Ok(places)
    }
}
