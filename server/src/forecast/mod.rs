pub mod aggregate;
pub mod icons;
#[cfg(test)]
pub mod mock;
pub mod openweather;
pub mod types;

use async_trait::async_trait;
use moka::future::Cache;
use openweather::OpenWeatherError;
use serde_json::Value;
use types::*;

pub type GeocodeCache = Cache<String, Vec<GeocodeResponse>>;

pub fn init_geocode_cache() -> GeocodeCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(crate::utils::geocode_cache_ttl())
        .build()
}

/// Upstream weather source. Current and forecast documents are returned verbatim
/// so the `/api/` proxy endpoints can pass them through untouched.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError>;

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Value, OpenWeatherError>;

    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodeResponse>, OpenWeatherError>;
}

/// Best upstream match for a free-text place; ties are upstream's call.
pub async fn resolve_place(
    gateway: &dyn WeatherGateway,
    query: &str,
) -> Result<GeocodeResponse, OpenWeatherError> {
    gateway
        .geocode(query.trim(), 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| OpenWeatherError::NotFound(query.trim().to_string()))
}
