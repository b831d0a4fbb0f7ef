use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::api::types::{RateLimitToggle, RequestEvent, Snapshot};
use crate::api::{envelope, FetchError};

// Bounds how long an unresponsive backend can keep a feed in-flight.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP client for the monitored backend, shared by every feed.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<ApiClient, FetchError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/system/snapshot`
    pub fn snapshot(&self) -> Result<Snapshot, FetchError> {
        self.call(Method::GET, "/api/system/snapshot")
    }

    /// `GET /api/system/recent-requests?limit=N`
    pub fn recent_requests(&self, limit: usize) -> Result<Vec<RequestEvent>, FetchError> {
        self.call(
            Method::GET,
            &format!("/api/system/recent-requests?limit={limit}"),
        )
    }

    /// `POST /api/system/rate-limit/toggle` — non-idempotent.
    pub fn toggle_rate_limit(&self) -> Result<RateLimitToggle, FetchError> {
        self.call(Method::POST, "/api/system/rate-limit/toggle")
    }

    fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .request(method.clone(), &url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let data = envelope::unwrap(status, &body).inspect_err(|e| {
            tracing::debug!(%method, path, status, error = %e, "backend call failed");
        })?;
        serde_json::from_value(data).map_err(|e| FetchError::Protocol(e.to_string()))
    }
}
