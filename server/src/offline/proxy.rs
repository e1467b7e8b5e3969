use super::fetch::{FetchRequest, FetchResponse};
use super::worker::{FetchOutcome, OfflineError, OfflineWorker, WorkerState};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Debug, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub cache_name: String,
    pub generations: Vec<String>,
    pub entries: Vec<String>,
}

/// Edge proxy in front of the origin. Every request goes through the offline
/// worker first; whatever it does not intercept is forwarded unchanged.
pub fn create_proxy_router(worker: Arc<OfflineWorker>) -> Router {
    Router::new()
        .route("/__offline/status", get(status))
        .fallback(forward)
        .with_state(worker)
        .layer(CorsLayer::permissive())
}

/// Run the install and activate steps in order
pub async fn start_worker(worker: &OfflineWorker) -> Result<(), OfflineError> {
    worker.install().await?;
    worker.activate().await?;
    Ok(())
}

async fn status(State(worker): State<Arc<OfflineWorker>>) -> Json<WorkerStatus> {
    let storage = worker.storage();
    Json(WorkerStatus {
        state: worker.state().await,
        cache_name: worker.cache_name().to_string(),
        generations: storage.keys().await,
        entries: storage.entry_keys(worker.cache_name()).await,
    })
}

async fn forward(
    State(worker): State<Arc<OfflineWorker>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match to_fetch_request(&worker, &method, &uri, &headers, body) {
        Ok(request) => request,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let response = match worker.handle_fetch(&request).await {
        FetchOutcome::Respond(response) => response,
        FetchOutcome::PassThrough => match worker.network(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Pass-through {} {} failed: {}", method, request.url, e);
                FetchResponse::text(502, "Origin unreachable")
            }
        },
    };

    into_response(response)
}

fn to_fetch_request(
    worker: &OfflineWorker,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<FetchRequest, String> {
    let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|_| format!("Unsupported method {}", method))?;
    let url = origin_url(worker.origin(), uri)?;

    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(FetchRequest {
        method,
        url,
        headers,
        body: body.to_vec(),
    })
}

/// Place the request path and query on the origin. The proxy never talks to
/// any other host, whatever the request target looks like.
fn origin_url(origin: &Url, uri: &Uri) -> Result<Url, String> {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url.set_fragment(None);

    if url.origin() != origin.origin() {
        return Err(format!("Request target {} leaves the origin", uri));
    }
    Ok(url)
}

fn into_response(fetched: FetchResponse) -> Response {
    let mut response = Response::new(Body::from(fetched.body));
    *response.status_mut() = StatusCode::from_u16(fetched.status).unwrap_or(StatusCode::BAD_GATEWAY);
    for (name, value) in fetched.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response.headers_mut().append(name, value);
        }
    }
    response
}
