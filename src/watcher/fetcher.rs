//! HTTP fetcher implementation
//!
//! This module handles page requests for the watcher:
//! - Building the shared HTTP client with a browser-like user agent
//! - GET requests bounded by the configured timeout
//! - Error classification into timeout, network and status failures
//!
//! There are no retries here; a failed fetch simply yields no classification
//! for the current tick.

use crate::config::HttpConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration (timeout and user agent)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use slot_watch::config::HttpConfig;
/// use slot_watch::watcher::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its body on a 2xx response
///
/// | Condition            | Result                    |
/// |----------------------|---------------------------|
/// | 2xx                  | `Ok(body)`                |
/// | any other status     | `FetchError::HttpStatus`  |
/// | timeout (any phase)  | `FetchError::Timeout`     |
/// | other transport error| `FetchError::Network`     |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}
