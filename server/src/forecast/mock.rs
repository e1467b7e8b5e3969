use super::openweather::OpenWeatherError;
use super::types::*;
use super::WeatherGateway;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Canned upstream: one known place and a synthetic 5-day forecast.
pub struct MockWeatherClient {
    pub start: DateTime<Utc>,
    places: Vec<GeocodeResponse>,
    fail_forecast: AtomicBool,
    pub current_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
}

impl MockWeatherClient {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            places: vec![GeocodeResponse {
                name: "Sydney".to_string(),
                local_names: None,
                lat: -33.8688,
                lon: 151.2093,
                country: "AU".to_string(),
                state: Some("New South Wales".to_string()),
            }],
            fail_forecast: AtomicBool::new(false),
            current_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_forecast(&self) {
        self.fail_forecast.store(true, Ordering::SeqCst);
    }

    /// 40 three-hour samples, temperature following a daily sine
    pub fn forecast_json(&self) -> Value {
        let list: Vec<Value> = (0..40)
            .map(|step| {
                let temp = 20.0 + 5.0 * (step as f64 * 0.785).sin();
                let humidity = 60 + (step % 8) * 2;
                let icon = if step % 8 < 4 { "01n" } else { "10d" };
                json!({
                    "dt": (self.start + Duration::hours(3 * step)).timestamp(),
                    "main": { "temp": temp, "humidity": humidity },
                    "weather": [{ "id": 800, "icon": icon, "description": "mock sky" }]
                })
            })
            .collect();

        json!({ "cod": "200", "cnt": list.len(), "list": list })
    }
}

#[async_trait]
impl WeatherGateway for MockWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        crate::utils::validate_coordinates(lat, lon).map_err(OpenWeatherError::InvalidCoordinates)?;

        Ok(json!({
            "name": "Upstream Name",
            "sys": { "country": "XX", "sunrise": 1 },
            "main": { "temp": 22.5, "feels_like": 23.1, "humidity": 64, "pressure": 1015 },
            "weather": [{ "id": 801, "icon": "02d", "description": "few clouds" }],
            "wind": { "speed": 4.1 },
            "visibility": 10000,
            "clouds": { "all": 20 }
        }))
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        crate::utils::validate_coordinates(lat, lon).map_err(OpenWeatherError::InvalidCoordinates)?;

        if self.fail_forecast.load(Ordering::SeqCst) {
            return Err(OpenWeatherError::ApiError {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        Ok(self.forecast_json())
    }

    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodeResponse>, OpenWeatherError> {
        let needle = query.to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|p| needle.starts_with(&p.name.to_lowercase()))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
