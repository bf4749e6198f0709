//! Storefront listing checks over plain HTTP.
//!
//! Before a browser is launched, each app id is looked up on the details
//! page (`?id=<app_id>&hl=<lang>`). Network failures, 429 and 5xx are
//! retried with exponential backoff, honouring `Retry-After`; any other
//! status settles the answer.
//!
//! ```no_run
//! # async fn demo() -> Result<(), playscrape_http::HttpError> {
//! use playscrape_http::{Listing, ListingRequest, StorefrontClient};
//!
//! let client = StorefrontClient::new("https://play.google.com", "store/apps/details")?;
//! let listing = client.listing(ListingRequest::new("com.example.app")).await?;
//! assert_eq!(listing, Listing::Live);
//! # Ok(()) }
//! ```

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const MAX_RETRY_AFTER_SECS: u64 = 30;
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
}

/// One details-page lookup.
///
/// ```
/// use playscrape_http::ListingRequest;
/// use std::time::Duration;
///
/// let req = ListingRequest::new("com.example.app").with_timeout(Duration::from_secs(30));
/// assert_eq!(req.hl, "en");
/// assert_eq!(req.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Debug)]
pub struct ListingRequest<'a> {
    pub app_id: &'a str,
    /// Storefront language, sent as `hl`.
    pub hl: &'a str,
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
}

impl<'a> ListingRequest<'a> {
    pub fn new(app_id: &'a str) -> Self {
        Self {
            app_id,
            hl: DEFAULT_LANGUAGE,
            timeout: None,
            retries: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn query(&self) -> [(&'static str, &'a str); 2] {
        [("id", self.app_id), ("hl", self.hl)]
    }
}

/// What the storefront said about an app id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listing {
    Live,
    /// Any final status other than 200, e.g. 404 for an unknown id.
    Unavailable(StatusCode),
}

impl From<StatusCode> for Listing {
    fn from(status: StatusCode) -> Self {
        if status == StatusCode::OK {
            Listing::Live
        } else {
            Listing::Unavailable(status)
        }
    }
}

#[derive(Clone)]
pub struct StorefrontClient {
    details: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl StorefrontClient {
    /// `details_path` is joined onto `base` once, here.
    ///
    /// ```no_run
    /// use playscrape_http::{HttpError, StorefrontClient};
    /// use std::time::Duration;
    ///
    /// let client = StorefrontClient::new("https://play.google.com", "store/apps/details")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str, details_path: &str) -> Result<Self, HttpError> {
        let details = Url::parse(base)
            .and_then(|b| b.join(details_path))
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            details,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Look the app up, retrying transient answers. The body is discarded.
    pub async fn listing(&self, req: ListingRequest<'_>) -> Result<Listing, HttpError> {
        let max_retries = req.retries.unwrap_or(self.max_retries);
        let timeout = req.timeout.unwrap_or(self.default_timeout);
        let mut attempt = 0usize;

        loop {
            tracing::debug!(
                target: "http",
                app_id = req.app_id,
                attempt = attempt + 1,
                max_retries,
                timeout_ms = timeout.as_millis() as u64,
                "http.listing.start"
            );

            let t0 = Instant::now();
            let sent = self
                .inner
                .get(self.details.clone())
                .query(&req.query())
                .timeout(timeout)
                .send()
                .await;
            let resp = match sent {
                Ok(resp) => resp,
                Err(err) if attempt < max_retries => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::warn!(
                        target: "http",
                        app_id = req.app_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "http.listing.retry_network"
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(target: "http", app_id = req.app_id, error = %err, "http.listing.network_error");
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            let status = resp.status();
            tracing::debug!(
                target: "http",
                app_id = req.app_id,
                %status,
                duration_ms = t0.elapsed().as_millis() as u64,
                "http.listing.response"
            );

            let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if transient && attempt < max_retries {
                attempt += 1;
                let delay = retry_after_delay_secs(resp.headers())
                    .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
                    .unwrap_or_else(|| backoff(attempt));
                tracing::warn!(
                    target: "http",
                    app_id = req.app_id,
                    %status,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    "http.listing.retry_status"
                );
                sleep(delay).await;
                continue;
            }

            return Ok(Listing::from(status));
        }
    }
}

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1 << shift))
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}
