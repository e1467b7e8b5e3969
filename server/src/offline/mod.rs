//! Offline-first cache policy: a versioned response cache plus the worker that
//! decides, per request, between cache-first and network-first answers.

pub mod fetch;
pub mod proxy;
pub mod storage;
pub mod worker;

/// Every generation this worker owns starts with this prefix.
pub const CACHE_PREFIX: &str = "weathernow-";
/// Bump whenever the shell assets change.
pub const CACHE_NAME: &str = "weathernow-v3";
/// Minimal asset set needed to render the dashboard offline
pub const APP_SHELL: [&str; 4] = ["/", "/index.html", "/styles.css", "/script.js"];
/// Paths containing this marker are API calls and go network-first.
pub const API_MARKER: &str = "/api/";
/// Default cap on runtime entries per generation; the shell is not counted.
pub const DEFAULT_CACHE_ENTRIES: usize = 200;
