use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network unavailable: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// How a response relates to the origin that asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin, fully readable
    Basic,
    /// Served from another origin after a redirect
    Cors,
    /// Built locally by the worker
    Synthetic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
}

impl FetchResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
            kind: ResponseKind::Synthetic,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "text/plain; charset=utf-8".to_string())],
            body: body.as_bytes().to_vec(),
            kind: ResponseKind::Synthetic,
        }
    }
}

/// Network port of the offline worker
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_forwardable(name: &str) -> bool {
    !HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
        && !name.eq_ignore_ascii_case("host")
        && !name.eq_ignore_ascii_case("content-length")
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("WeatherNow-Offline/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        for (name, value) in request.headers.iter().filter(|(name, _)| is_forwardable(name)) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let kind = if response.url().origin() == request.url.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        };
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| is_forwardable(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
            kind,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_covers_2xx_only() {
        assert!(FetchResponse::text(200, "").ok());
        assert!(FetchResponse::text(204, "").ok());
        assert!(!FetchResponse::text(304, "").ok());
        assert!(!FetchResponse::text(500, "").ok());
    }

    #[test]
    fn test_json_response_sets_content_type() {
        let response = FetchResponse::json(200, &json!({ "error": "offline", "data": null }));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.kind, ResponseKind::Synthetic);
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "error": "offline", "data": null }));
    }

    #[test]
    fn test_hop_by_hop_headers_are_not_forwarded() {
        assert!(is_forwardable("content-type"));
        assert!(is_forwardable("Cache-Control"));
        assert!(!is_forwardable("Transfer-Encoding"));
        assert!(!is_forwardable("host"));
        assert!(!is_forwardable("Content-Length"));
    }
}
