use super::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, ResponseKind};
use super::storage::CacheStorage;
use super::{API_MARKER, APP_SHELL, CACHE_PREFIX};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker never intercepts anything
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Failed to pre-cache shell resource {url}: {reason}")]
    ShellResource { url: String, reason: String },
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: WorkerState,
    },
    #[error("Invalid resource URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted: the request goes to the network as-is
    PassThrough,
    Respond(FetchResponse),
}

pub fn offline_payload() -> FetchResponse {
    FetchResponse::json(200, &json!({ "error": "offline", "data": null }))
}

pub fn strategy_for(url: &Url) -> Strategy {
    if url.path().contains(API_MARKER) {
        Strategy::NetworkFirst
    } else {
        Strategy::CacheFirst
    }
}

/// Installable offline worker for one cache generation.
///
/// Lifecycle: `install` pre-caches the shell and is immediately ready,
/// `activate` drops older generations and starts intercepting. Only an
/// activated worker answers fetches.
pub struct OfflineWorker {
    origin: Url,
    cache_name: String,
    shell: Vec<String>,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<CacheStorage>,
    state: RwLock<WorkerState>,
    /// Held for the whole of `install` and `activate`
    lifecycle: Mutex<()>,
}

impl OfflineWorker {
    pub fn new(
        origin: Url,
        cache_name: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<CacheStorage>,
    ) -> Self {
        Self {
            origin,
            cache_name: cache_name.into(),
            shell: APP_SHELL.iter().map(|s| s.to_string()).collect(),
            fetcher,
            storage,
            state: RwLock::new(WorkerState::Installing),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Check `expected` and move to `next` under one write guard
    async fn transition(
        &self,
        operation: &'static str,
        expected: WorkerState,
        next: WorkerState,
    ) -> Result<(), OfflineError> {
        let mut state = self.state.write().await;
        if *state != expected {
            return Err(OfflineError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = next;
        Ok(())
    }

    /// Pre-cache every shell resource, all or nothing.
    pub async fn install(&self) -> Result<(), OfflineError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.transition("install", WorkerState::Installing, WorkerState::Installing)
            .await?;

        match self.fetch_shell().await {
            Ok(entries) => {
                self.storage.open(&self.cache_name).await;
                self.storage.put_all(&self.cache_name, entries).await;
                *self.state.write().await = WorkerState::Installed;
                tracing::info!(
                    "Offline worker installed {} ({} shell resources)",
                    self.cache_name,
                    self.shell.len()
                );
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = WorkerState::Redundant;
                tracing::error!("Offline worker install failed: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_shell(&self) -> Result<Vec<(Url, FetchResponse)>, OfflineError> {
        let mut entries = Vec::with_capacity(self.shell.len());
        for path in &self.shell {
            let url = self.origin.join(path)?;
            let response = self
                .fetcher
                .fetch(&FetchRequest::get(url.clone()))
                .await
                .map_err(|e| OfflineError::ShellResource {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            if !response.ok() {
                return Err(OfflineError::ShellResource {
                    url: url.to_string(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            entries.push((url, response));
        }
        Ok(entries)
    }

    /// Delete stale generations under our prefix, then take control.
    /// Returns the names of the deleted generations.
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.transition("activate", WorkerState::Installed, WorkerState::Activating)
            .await?;

        let mut deleted = Vec::new();
        for name in self.storage.keys().await {
            if name.starts_with(CACHE_PREFIX) && name != self.cache_name {
                if self.storage.delete(&name).await {
                    tracing::info!("Deleted stale cache generation {}", name);
                    deleted.push(name);
                }
            }
        }

        *self.state.write().await = WorkerState::Activated;
        tracing::info!("Offline worker {} activated and controlling clients", self.cache_name);
        Ok(deleted)
    }

    pub fn intercepts(&self, request: &FetchRequest) -> bool {
        request.method == Method::GET && request.url.origin() == self.origin.origin()
    }

    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        if self.state().await != WorkerState::Activated || !self.intercepts(request) {
            return FetchOutcome::PassThrough;
        }

        let response = match strategy_for(&request.url) {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        };
        FetchOutcome::Respond(response)
    }

    /// Plain network fetch for requests the worker does not intercept
    pub async fn network(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.fetcher.fetch(request).await
    }

    async fn network_first(&self, request: &FetchRequest) -> FetchResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.storage
                        .put(&self.cache_name, &request.url, response.clone())
                        .await;
                }
                response
            }
            Err(e) => {
                tracing::debug!("Network failed for {}: {}", request.url, e);
                match self.storage.match_exact(&self.cache_name, &request.url).await {
                    Some(cached) => cached,
                    None => offline_payload(),
                }
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> FetchResponse {
        if let Some(cached) = self
            .storage
            .match_ignore_search(&self.cache_name, &request.url)
            .await
        {
            return cached;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() && response.kind == ResponseKind::Basic {
                    self.storage
                        .put(&self.cache_name, &request.url, response.clone())
                        .await;
                }
                response
            }
            Err(e) => {
                tracing::debug!("Network failed for uncached {}: {}", request.url, e);
                FetchResponse::text(503, "Offline and not cached")
            }
        }
    }
}
