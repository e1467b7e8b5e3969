use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    database::{Database, DatabaseError, LastPlace},
    forecast::{
        aggregate::ForecastZone,
        openweather::OpenWeatherError,
        resolve_place,
        types::{
            CurrentConditions, CurrentWeatherResponse, DaySummary, ForecastResponse,
            GeocodeResponse, HourlySlot, PlaceSuggestion,
        },
        WeatherGateway,
    },
    utils::ErrorResponse,
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub gateway: Arc<dyn WeatherGateway>,
    pub zone: ForecastZone,
}

#[derive(Debug)]
pub enum ApiError {
    MissingCity,
    Gateway(OpenWeatherError),
    Storage(DatabaseError),
    NoLastPlace,
}

impl From<OpenWeatherError> for ApiError {
    fn from(e: OpenWeatherError) -> Self {
        ApiError::Gateway(e)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingCity => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("missing_city", "Provide ?city= or ?lat=&lon="),
            ),
            ApiError::Gateway(OpenWeatherError::NotFound(place)) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(
                    "not_found",
                    format!(
                        "Could not find a place for \"{}\". Try a city like \"Sydney\" or \"Sydney, AU\".",
                        place
                    ),
                ),
            ),
            ApiError::Gateway(OpenWeatherError::InvalidCoordinates(message)) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_coordinates", message),
            ),
            ApiError::Gateway(e) => {
                tracing::error!("Upstream weather request failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new("server_error", "Failed to fetch weather data"),
                )
            }
            ApiError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("server_error", "Failed to access storage"),
                )
            }
            ApiError::NoLastPlace => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("not_found", "No place has been searched yet"),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct PlaceQuery {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct LocationInfo {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlySlot>,
    pub daily: Vec<DaySummary>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

struct ResolvedPlace {
    lat: f64,
    lon: f64,
    query: Option<String>,
    geocoded: Option<GeocodeResponse>,
}

async fn resolve(gateway: &dyn WeatherGateway, params: &PlaceQuery) -> Result<ResolvedPlace, ApiError> {
    // Coordinates win over a city name
    if let (Some(lat), Some(lon)) = (params.lat, params.lon) {
        return Ok(ResolvedPlace {
            lat,
            lon,
            query: None,
            geocoded: None,
        });
    }

    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingCity)?;

    let place = resolve_place(gateway, city).await?;
    tracing::debug!("Resolved {:?} to {} ({}, {})", city, place.name, place.lat, place.lon);

    Ok(ResolvedPlace {
        lat: place.lat,
        lon: place.lon,
        query: Some(city.to_string()),
        geocoded: Some(place),
    })
}

/// Overwrite upstream name and country with the geocoded ones
fn annotate_place(current: &mut Value, place: &GeocodeResponse) {
    let Some(object) = current.as_object_mut() else {
        return;
    };

    if !place.name.is_empty() {
        object.insert("name".to_string(), json!(place.name));
    }
    if !place.country.is_empty() {
        let sys = object.entry("sys").or_insert_with(|| json!({}));
        if let Some(sys) = sys.as_object_mut() {
            sys.insert("country".to_string(), json!(place.country));
        }
    }
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_current(
    State(state): State<AppState>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<Value>, ApiError> {
    let place = resolve(state.gateway.as_ref(), &params).await?;
    let mut current = state.gateway.current(place.lat, place.lon).await?;

    if let Some(geocoded) = &place.geocoded {
        annotate_place(&mut current, geocoded);
    }
    Ok(Json(current))
}

pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<Value>, ApiError> {
    let place = resolve(state.gateway.as_ref(), &params).await?;
    let forecast = state.gateway.forecast(place.lat, place.lon).await?;
    Ok(Json(forecast))
}

pub async fn search_places(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<PlaceSuggestion>>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let places = state.gateway.geocode(query, 5).await?;
    Ok(Json(places.into_iter().map(PlaceSuggestion::from).collect()))
}

/// Current conditions plus hourly and daily strips in one response.
/// Both upstream calls run concurrently; either failing fails the whole request.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let place = resolve(state.gateway.as_ref(), &params).await?;

    let (mut current_raw, forecast_raw) = tokio::try_join!(
        state.gateway.current(place.lat, place.lon),
        state.gateway.forecast(place.lat, place.lon),
    )?;

    if let Some(geocoded) = &place.geocoded {
        annotate_place(&mut current_raw, geocoded);
    }

    let current: CurrentWeatherResponse =
        serde_json::from_value(current_raw).map_err(OpenWeatherError::from)?;
    let forecast: ForecastResponse =
        serde_json::from_value(forecast_raw).map_err(OpenWeatherError::from)?;

    let samples = forecast.samples();
    let now = chrono::Utc::now();
    let hourly = state.zone.select_hourly(&samples);
    let daily = state.zone.aggregate_daily(&samples, now);

    let name = current.name.clone().filter(|n| !n.is_empty());
    let remembered = place
        .query
        .clone()
        .or_else(|| name.clone())
        .unwrap_or_else(|| "Your location".to_string());
    if let Err(e) = state.database.save_last_place(&remembered).await {
        tracing::warn!("Failed to remember last place {:?}: {}", remembered, e);
    }

    Ok(Json(DashboardResponse {
        location: LocationInfo {
            lat: place.lat,
            lon: place.lon,
            name,
            country: current.sys.as_ref().and_then(|s| s.country.clone()),
        },
        current: CurrentConditions::from(&current),
        hourly,
        daily,
        generated_at: now,
    }))
}

pub async fn get_last_place(State(state): State<AppState>) -> Result<Json<LastPlace>, ApiError> {
    state
        .database
        .get_last_place()
        .await?
        .map(Json)
        .ok_or(ApiError::NoLastPlace)
}

// Create the router
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/current", get(get_current))
        .route("/api/forecast", get(get_forecast))
        .route("/api/search", get(search_places))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/last-place", get(get_last_place))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
