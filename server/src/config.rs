use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_current_path: String,
    pub openweather_forecast_path: String,
    pub openweather_geocode_direct_path: String,
    /// IANA zone used for day bucketing. `None` means the process local zone.
    pub app_timezone: Option<String>,
    pub port: u16,
    pub static_dir: String,
    pub database_url: String,
    pub offline_proxy_port: Option<u16>,
    pub offline_origin_url: String,
    pub cache_version: String,
    /// Cap on runtime entries per offline cache generation
    pub offline_cache_entries: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT is not a valid port: {}", raw))?,
            Err(_) => 5173,
        };

        let offline_proxy_port = match env::var("OFFLINE_PROXY_PORT") {
            Ok(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|_| anyhow::anyhow!("OFFLINE_PROXY_PORT is not a valid port: {}", raw))?,
            ),
            Err(_) => None,
        };

        let offline_cache_entries = match env::var("OFFLINE_CACHE_ENTRIES") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("OFFLINE_CACHE_ENTRIES is not a valid count: {}", raw))?,
            Err(_) => crate::offline::DEFAULT_CACHE_ENTRIES,
        };

        let app_timezone = env::var("APP_TIMEZONE").ok().filter(|tz| !tz.trim().is_empty());
        if let Some(tz) = &app_timezone {
            crate::utils::parse_timezone(tz).map_err(|e| anyhow::anyhow!(e))?;
        }

        Ok(Config {
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENWEATHER_API_KEY not set"))?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_current_path: env::var("OPENWEATHER_CURRENT_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_forecast_path: env::var("OPENWEATHER_FORECAST_PATH")
                .unwrap_or_else(|_| "/data/2.5/forecast".to_string()),
            openweather_geocode_direct_path: env::var("OPENWEATHER_GEOCODE_DIRECT_PATH")
                .unwrap_or_else(|_| "/geo/1.0/direct".to_string()),
            app_timezone,
            port,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./public".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./weathernow.db?mode=rwc".to_string()),
            offline_proxy_port,
            offline_origin_url: env::var("OFFLINE_ORIGIN_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{}", port)),
            cache_version: env::var("CACHE_VERSION")
                .unwrap_or_else(|_| crate::offline::CACHE_NAME.to_string()),
            offline_cache_entries,
        })
    }
}
