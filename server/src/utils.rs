use serde::Serialize;

/// Validate latitude and longitude coordinates
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), String> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("Invalid latitude: {}. Must be between -90 and 90", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("Invalid longitude: {}. Must be between -180 and 180", lon));
    }
    Ok(())
}

/// Round to the nearest integer, with halves going toward positive infinity
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Parse timezone string and validate
pub fn parse_timezone(tz_str: &str) -> Result<chrono_tz::Tz, String> {
    tz_str
        .parse::<chrono_tz::Tz>()
        .map_err(|_| format!("Invalid timezone: {}", tz_str))
}

/// Generate a cache key for geocode lookups
pub fn geocode_cache_key(query: &str, limit: u32) -> String {
    format!("geocode_{}_{}", limit, query.trim().to_lowercase())
}

/// Geocode results are stable, keep them for a day
pub fn geocode_cache_ttl() -> std::time::Duration {
    std::time::Duration::from_secs(24 * 60 * 60)
}

/// Error body returned by every `/api/` handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}
