use super::fetch::FetchResponse;
use reqwest::Url;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;

fn without_search(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped.to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    search_key: String,
    response: FetchResponse,
    /// Pre-cached at install; never evicted
    pinned: bool,
}

/// One named cache generation, keyed by exact URL.
///
/// Entries keep insertion order and `put` on an existing key replaces the
/// response in place. Entries stored at runtime are capped at `limit`; once
/// full, the oldest runtime entry makes room for the new one.
#[derive(Debug, Clone)]
pub struct Cache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    runtime: usize,
    limit: usize,
}

impl Cache {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            runtime: 0,
            limit: limit.max(1),
        }
    }

    pub fn put(&mut self, url: &Url, response: FetchResponse) {
        self.insert(url, response, false);
    }

    /// Store a response that eviction must never touch
    pub fn pin(&mut self, url: &Url, response: FetchResponse) {
        self.insert(url, response, true);
    }

    fn insert(&mut self, url: &Url, response: FetchResponse, pinned: bool) {
        let key = url.to_string();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.response = response;
            if pinned && !entry.pinned {
                entry.pinned = true;
                self.runtime -= 1;
            }
            return;
        }

        if !pinned {
            while self.runtime >= self.limit {
                if !self.evict_oldest_runtime() {
                    break;
                }
            }
            self.runtime += 1;
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                search_key: without_search(url),
                response,
                pinned,
            },
        );
    }

    fn evict_oldest_runtime(&mut self) -> bool {
        let position = self
            .order
            .iter()
            .position(|key| self.entries.get(key).is_some_and(|e| !e.pinned));
        let Some(key) = position.and_then(|p| self.order.remove(p)) else {
            return false;
        };

        self.entries.remove(&key);
        self.runtime -= 1;
        tracing::debug!("Evicted cached response {}", key);
        true
    }

    pub fn match_exact(&self, url: &Url) -> Option<&FetchResponse> {
        self.entries.get(url.as_str()).map(|e| &e.response)
    }

    /// First entry whose URL equals `url` once both query strings are dropped
    pub fn match_ignore_search(&self, url: &Url) -> Option<&FetchResponse> {
        let wanted = without_search(url);
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .find(|e| e.search_key == wanted)
            .map(|e| &e.response)
    }

    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

/// All cache generations, shared by every request the worker handles.
/// Concurrent writers to the same key: last one wins.
#[derive(Debug)]
pub struct CacheStorage {
    generations: RwLock<BTreeMap<String, Cache>>,
    entry_limit: usize,
}

impl CacheStorage {
    /// `entry_limit` caps the runtime entries of each generation
    pub fn new(entry_limit: usize) -> Self {
        Self {
            generations: RwLock::new(BTreeMap::new()),
            entry_limit,
        }
    }

    /// Create the generation if it does not exist yet
    pub async fn open(&self, name: &str) {
        let limit = self.entry_limit;
        self.generations
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(limit));
    }

    pub async fn keys(&self) -> Vec<String> {
        self.generations.read().await.keys().cloned().collect()
    }

    pub async fn delete(&self, name: &str) -> bool {
        self.generations.write().await.remove(name).is_some()
    }

    pub async fn put(&self, name: &str, url: &Url, response: FetchResponse) {
        let limit = self.entry_limit;
        self.generations
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(limit))
            .put(url, response);
    }

    /// Pin every entry under one lock so readers never see a partial batch
    pub async fn put_all(&self, name: &str, entries: Vec<(Url, FetchResponse)>) {
        let limit = self.entry_limit;
        let mut generations = self.generations.write().await;
        let cache = generations
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(limit));
        for (url, response) in entries {
            cache.pin(&url, response);
        }
    }

    pub async fn match_exact(&self, name: &str, url: &Url) -> Option<FetchResponse> {
        self.generations
            .read()
            .await
            .get(name)
            .and_then(|cache| cache.match_exact(url))
            .cloned()
    }

    pub async fn match_ignore_search(&self, name: &str, url: &Url) -> Option<FetchResponse> {
        self.generations
            .read()
            .await
            .get(name)
            .and_then(|cache| cache.match_ignore_search(url))
            .cloned()
    }

    pub async fn entry_keys(&self, name: &str) -> Vec<String> {
        self.generations
            .read()
            .await
            .get(name)
            .map(Cache::keys)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::DEFAULT_CACHE_ENTRIES;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let mut cache = Cache::new(DEFAULT_CACHE_ENTRIES);
        cache.put(&url("http://app.test/a"), FetchResponse::text(200, "one"));
        cache.put(&url("http://app.test/a"), FetchResponse::text(200, "two"));

        assert_eq!(cache.keys(), vec!["http://app.test/a"]);
        assert_eq!(cache.match_exact(&url("http://app.test/a")).unwrap().body, b"two");
    }

    #[test]
    fn test_exact_match_includes_query() {
        let mut cache = Cache::new(DEFAULT_CACHE_ENTRIES);
        cache.put(&url("http://app.test/api/current?city=Oslo"), FetchResponse::text(200, "oslo"));

        assert!(cache.match_exact(&url("http://app.test/api/current?city=Oslo")).is_some());
        assert!(cache.match_exact(&url("http://app.test/api/current?city=Rome")).is_none());
        assert!(cache.match_exact(&url("http://app.test/api/current")).is_none());
    }

    #[test]
    fn test_ignore_search_match() {
        let mut cache = Cache::new(DEFAULT_CACHE_ENTRIES);
        cache.put(&url("http://app.test/script.js?v=1"), FetchResponse::text(200, "js"));

        assert!(cache.match_ignore_search(&url("http://app.test/script.js")).is_some());
        assert!(cache.match_ignore_search(&url("http://app.test/script.js?v=2")).is_some());
        assert!(cache.match_ignore_search(&url("http://app.test/styles.css")).is_none());
    }

    #[test]
    fn test_ignore_search_prefers_oldest_entry() {
        let mut cache = Cache::new(DEFAULT_CACHE_ENTRIES);
        cache.put(&url("http://app.test/app.js?v=1"), FetchResponse::text(200, "first"));
        cache.put(&url("http://app.test/app.js?v=2"), FetchResponse::text(200, "second"));

        let hit = cache.match_ignore_search(&url("http://app.test/app.js")).unwrap();
        assert_eq!(hit.body, b"first");
    }

    #[test]
    fn test_runtime_entries_are_capped() {
        let mut cache = Cache::new(3);
        for city in ["Oslo", "Rome", "Lima", "Cairo", "Quito"] {
            let api = url(&format!("http://app.test/api/current?city={}", city));
            cache.put(&api, FetchResponse::text(200, city));
        }

        assert_eq!(
            cache.keys(),
            vec![
                "http://app.test/api/current?city=Lima",
                "http://app.test/api/current?city=Cairo",
                "http://app.test/api/current?city=Quito",
            ]
        );
        assert!(cache.match_exact(&url("http://app.test/api/current?city=Oslo")).is_none());
    }

    #[test]
    fn test_pinned_entries_survive_eviction() {
        let mut cache = Cache::new(1);
        cache.pin(&url("http://app.test/"), FetchResponse::text(200, "shell"));
        cache.put(&url("http://app.test/api/forecast?city=Oslo"), FetchResponse::text(200, "oslo"));
        cache.put(&url("http://app.test/api/forecast?city=Rome"), FetchResponse::text(200, "rome"));

        assert_eq!(
            cache.keys(),
            vec!["http://app.test/", "http://app.test/api/forecast?city=Rome"]
        );
        assert_eq!(cache.match_exact(&url("http://app.test/")).unwrap().body, b"shell");
    }

    #[test]
    fn test_refreshing_a_key_does_not_evict() {
        let mut cache = Cache::new(2);
        let oslo = url("http://app.test/api/current?city=Oslo");
        let rome = url("http://app.test/api/current?city=Rome");
        cache.put(&oslo, FetchResponse::text(200, "1"));
        cache.put(&rome, FetchResponse::text(200, "1"));
        cache.put(&oslo, FetchResponse::text(200, "2"));

        assert_eq!(cache.keys().len(), 2);
        assert_eq!(cache.match_exact(&oslo).unwrap().body, b"2");
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = CacheStorage::new(DEFAULT_CACHE_ENTRIES);
        storage.open("weathernow-v1").await;
        storage
            .put("weathernow-v2", &url("http://app.test/"), FetchResponse::text(200, "v2"))
            .await;

        assert_eq!(storage.keys().await, vec!["weathernow-v1", "weathernow-v2"]);
        assert!(storage.match_exact("weathernow-v1", &url("http://app.test/")).await.is_none());
        assert!(storage.match_exact("weathernow-v2", &url("http://app.test/")).await.is_some());

        assert!(storage.delete("weathernow-v1").await);
        assert!(!storage.delete("weathernow-v1").await);
        assert_eq!(storage.keys().await, vec!["weathernow-v2"]);
    }

    #[tokio::test]
    async fn test_open_keeps_existing_entries() {
        let storage = CacheStorage::new(DEFAULT_CACHE_ENTRIES);
        storage
            .put_all(
                "weathernow-v3",
                vec![
                    (url("http://app.test/"), FetchResponse::text(200, "index")),
                    (url("http://app.test/styles.css"), FetchResponse::text(200, "css")),
                ],
            )
            .await;
        storage.open("weathernow-v3").await;

        assert_eq!(
            storage.entry_keys("weathernow-v3").await,
            vec!["http://app.test/", "http://app.test/styles.css"]
        );
    }

    #[tokio::test]
    async fn test_storage_applies_entry_limit_per_generation() {
        let storage = CacheStorage::new(2);
        storage
            .put_all("weathernow-v3", vec![(url("http://app.test/"), FetchResponse::text(200, "shell"))])
            .await;
        for lat in 0..5 {
            let api = url(&format!("http://app.test/api/forecast?lat={}&lon=0", lat));
            storage.put("weathernow-v3", &api, FetchResponse::text(200, "{}")).await;
        }

        assert_eq!(
            storage.entry_keys("weathernow-v3").await,
            vec![
                "http://app.test/",
                "http://app.test/api/forecast?lat=3&lon=0",
                "http://app.test/api/forecast?lat=4&lon=0",
            ]
        );
    }
}
