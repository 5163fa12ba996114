//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-request timeout
//! - Outcome classification (success, redirect, client/server error,
//!   timeout, connection error)
//! - Retry with doubling backoff for transient failures only
//!
//! Redirects are never followed here. A 3xx response is returned as-is so
//! its `Location` can be recorded as a discovered link.

use crate::config::Config;
use crate::state::FetchState;
use crate::url::CanonicalUrl;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on the TCP connect phase, never above the request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single fetch
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// 2xx with the body read in full
    Success {
        status: u16,
        headers: HeaderMap,
        content_type: Option<String>,
        body: Vec<u8>,
    },

    /// 3xx; not followed
    Redirect {
        status: u16,
        headers: HeaderMap,
        location: Option<String>,
    },

    /// 4xx
    ClientError { status: u16 },

    /// 5xx
    ServerError { status: u16 },

    /// The request or the body read timed out
    Timeout,

    /// DNS, connect, TLS or a reset mid-transfer
    ConnectionError { message: String },
}

impl FetchOutcome {
    /// Returns the outcome class recorded in the ledger
    pub fn state(&self) -> FetchState {
        match self {
            Self::Success { .. } => FetchState::Success,
            Self::Redirect { .. } => FetchState::Redirect,
            Self::ClientError { .. } => FetchState::ClientError,
            Self::ServerError { .. } => FetchState::ServerError,
            Self::Timeout => FetchState::Timeout,
            Self::ConnectionError { .. } => FetchState::ConnectionError,
        }
    }

    /// Returns the HTTP status code, if a response arrived
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. }
            | Self::Redirect { status, .. }
            | Self::ClientError { status }
            | Self::ServerError { status } => Some(*status),
            Self::Timeout | Self::ConnectionError { .. } => None,
        }
    }

    /// Response headers for outcomes that carry them
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Self::Success { headers, .. } | Self::Redirect { headers, .. } => Some(headers),
            _ => None,
        }
    }
}

/// A fetch as seen by a page visitor
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: CanonicalUrl,

    /// Position of the URL in dequeue order
    pub crawl_index: usize,

    pub outcome: FetchOutcome,

    /// Attempts made, including the first
    pub attempts: u32,

    pub fetched_at: DateTime<Utc>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The loaded configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = config.crawler.request_timeout();

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .redirect(Policy::none()) // Redirect targets become ledger entries
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once and classifies the result
pub async fn fetch_once(client: &Client, url: &CanonicalUrl) -> FetchOutcome {
    match client.get(url.as_str()).send().await {
        Ok(response) => classify_response(response).await,
        Err(e) => classify_error(&e),
    }
}

/// Fetches a URL, retrying timeouts and connection errors
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx / 3xx | Returned immediately |
/// | HTTP 4xx / 5xx | Returned immediately, never retried |
/// | Timeout | Retried up to `max_retries` times |
/// | Connection error | Retried up to `max_retries` times |
///
/// Before retry `n` the loop awaits `pause(backoff * 2^(n-1))`. Passing
/// `tokio::time::sleep` waits out the backoff alone; the pool passes a
/// pause that also books the host's next politeness slot.
///
/// # Returns
///
/// The final outcome and the number of attempts made
pub async fn fetch_with_retry<F, Fut>(
    client: &Client,
    url: &CanonicalUrl,
    max_retries: u32,
    backoff: Duration,
    mut pause: F,
) -> (FetchOutcome, u32)
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut attempts = 0;
    let mut delay = backoff;

    loop {
        attempts += 1;
        let outcome = fetch_once(client, url).await;

        if !outcome.state().is_transient() || attempts > max_retries {
            if outcome.state().is_transient() {
                warn!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    attempts,
                    outcome.state()
                );
            }
            return (outcome, attempts);
        }

        debug!(
            "Transient failure for {} ({}), retry {}/{} after {:?} backoff",
            url,
            outcome.state(),
            attempts,
            max_retries,
            delay
        );
        pause(delay).await;
        delay = delay.saturating_mul(2);
    }
}

async fn classify_response(response: Response) -> FetchOutcome {
    let status = response.status();
    let code = status.as_u16();

    if status.is_redirection() {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        return FetchOutcome::Redirect {
            status: code,
            headers: response.headers().clone(),
            location,
        };
    }

    if status.is_server_error() {
        return FetchOutcome::ServerError { status: code };
    }

    if !status.is_success() {
        return FetchOutcome::ClientError { status: code };
    }

    let headers = response.headers().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match response.bytes().await {
        Ok(body) => FetchOutcome::Success {
            status: code,
            headers,
            content_type,
            body: body.to_vec(),
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(error: &reqwest::Error) -> FetchOutcome {
    if error.is_timeout() {
        FetchOutcome::Timeout
    } else {
        FetchOutcome::ConnectionError {
            message: error.to_string(),
        }
    }
}
