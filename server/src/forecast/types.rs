use super::icons::{classify, IconId};
use crate::utils::round_half_up;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Upstream payloads. Every field is optional: a partial document degrades to
// absent values instead of failing the whole request.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sys: Option<CurrentSys>,
    #[serde(default)]
    pub main: Option<CurrentMain>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub wind: Option<CurrentWind>,
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub clouds: Option<CurrentClouds>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentSys {
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentMain {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentWind {
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentClouds {
    #[serde(default)]
    pub all: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherCondition {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Option<Vec<ForecastItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastItem {
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub main: Option<ForecastMain>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastMain {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub name: String,
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    pub state: Option<String>,
}

/// Trimmed geocode result returned by the place search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub name: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<GeocodeResponse> for PlaceSuggestion {
    fn from(g: GeocodeResponse) -> Self {
        Self {
            name: g.name,
            state: g.state.unwrap_or_default(),
            country: g.country,
            lat: g.lat,
            lon: g.lon,
        }
    }
}

/// One upstream 3-hour reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub timestamp: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub condition_code: String,
    pub condition_id: Option<i32>,
    pub description: String,
}

impl ForecastSample {
    /// Items without a timestamp cannot be placed on a day and are skipped.
    pub fn from_item(item: &ForecastItem) -> Option<Self> {
        let timestamp = item.dt?;
        let condition = item.weather.first();
        Some(Self {
            timestamp,
            temperature: item.main.as_ref().and_then(|m| m.temp),
            humidity: item.main.as_ref().and_then(|m| m.humidity),
            condition_code: condition
                .and_then(|c| c.icon.clone())
                .unwrap_or_default(),
            condition_id: condition.and_then(|c| c.id),
            description: condition
                .and_then(|c| c.description.clone())
                .unwrap_or_default(),
        })
    }
}

impl ForecastResponse {
    pub fn samples(&self) -> Vec<ForecastSample> {
        self.list
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(ForecastSample::from_item)
            .collect()
    }
}

/// Current conditions as the dashboard shows them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: Option<i32>,
    pub feels_like: Option<i32>,
    pub humidity: Option<i32>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub visibility: Option<f64>,
    pub clouds: Option<f64>,
    pub condition_id: Option<i32>,
    pub icon: IconId,
    pub description: String,
}

impl From<&CurrentWeatherResponse> for CurrentConditions {
    fn from(current: &CurrentWeatherResponse) -> Self {
        let main = current.main.clone().unwrap_or_default();
        let condition = current.weather.first();

        Self {
            temperature: main.temp.map(round_half_up),
            feels_like: main.feels_like.map(round_half_up),
            humidity: main.humidity.map(round_half_up),
            pressure: main.pressure,
            wind_speed: current.wind.as_ref().and_then(|w| w.speed),
            visibility: current.visibility,
            clouds: current.clouds.as_ref().and_then(|c| c.all),
            condition_id: condition.and_then(|c| c.id),
            icon: classify(
                condition
                    .and_then(|c| c.icon.as_deref())
                    .unwrap_or_default(),
            ),
            description: condition
                .and_then(|c| c.description.clone())
                .unwrap_or_default(),
        }
    }
}

/// One calendar day of the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: chrono::NaiveDate,
    pub label: String,
    pub high: Option<i32>,
    pub low: Option<i32>,
    pub humidity: Option<i32>,
    pub icon: IconId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySlot {
    pub timestamp: i64,
    pub label: String,
    pub temperature: Option<i32>,
    pub icon: IconId,
    pub description: String,
}
