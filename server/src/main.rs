use reqwest::Url;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod forecast;
mod offline;
mod routes;
mod utils;

use config::Config;
use database::Database;
use forecast::aggregate::ForecastZone;
use forecast::openweather::OpenWeatherClient;
use offline::fetch::HttpFetcher;
use offline::proxy::{create_proxy_router, start_worker};
use offline::storage::CacheStorage;
use offline::worker::OfflineWorker;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathernow_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let zone = ForecastZone::from_config(config.app_timezone.as_deref())?;
    match &config.app_timezone {
        Some(tz) => tracing::info!("Bucketing forecast days in {}", tz),
        None => tracing::info!("Bucketing forecast days in the local time zone"),
    }

    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let database = Arc::new(Database::new(pool));
    database.init_tables().await?;

    let weather_client = Arc::new(OpenWeatherClient::new(config.clone())?);

    let state = AppState {
        database,
        gateway: weather_client,
        zone,
    };

    let app = create_router(state, &config.static_dir).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Weather app running at http://0.0.0.0:{}", config.port);

    if let Some(proxy_port) = config.offline_proxy_port {
        spawn_offline_proxy(&config, proxy_port).await?;
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Offline-first edge in front of `offline_origin_url`. The worker installs in
/// the background; until it is active every request passes straight through.
async fn spawn_offline_proxy(config: &Config, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let origin = Url::parse(&config.offline_origin_url)?;
    let worker = Arc::new(OfflineWorker::new(
        origin.clone(),
        config.cache_version.clone(),
        Arc::new(HttpFetcher::new()?),
        Arc::new(CacheStorage::new(config.offline_cache_entries)),
    ));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let router = create_proxy_router(worker.clone()).layer(TraceLayer::new_for_http());
    tracing::info!("Offline proxy for {} at http://0.0.0.0:{}", origin, port);

    tokio::spawn(async move {
        if let Err(e) = start_worker(&worker).await {
            tracing::error!("Offline worker not active, passing requests through: {}", e);
        }
    });

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Offline proxy stopped: {}", e);
        }
    });

    Ok(())
}
