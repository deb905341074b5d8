use crate::error::DeliveryError;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{StatusCode, Url};
use std::time::Duration;

pub const AGENT_USER_AGENT: &str = "aix_agent";
pub const REMOTE_WRITE_VERSION_HEADER: &str = "X-Prometheus-Remote-Write-Version";
pub const REMOTE_WRITE_VERSION: &str = "0.1.0";

/// Maximum number of response body bytes quoted in a permanent error.
const MAX_ERR_MSG_LEN: usize = 1024;
const DEFAULT_BACKOFF: Duration = Duration::ZERO;

/// HTTP client for a single remote write endpoint.
pub struct Client {
    http: reqwest::Client,
    url: Url,
    retry_on_rate_limit: bool,
}

impl Client {
    /// `timeout` bounds each whole request, connect through body.
    pub fn new(url: Url, timeout: Duration, retry_on_rate_limit: bool) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Build(e.to_string()))?;
        Ok(Self {
            http,
            url,
            retry_on_rate_limit,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one compressed, serialized write request.
    ///
    /// Transport errors and 5xx responses are recoverable with no backoff
    /// hint. A 429 is recoverable with the `Retry-After` hint when rate-limit
    /// retries are enabled. Any other non-2xx response is permanent.
    pub async fn store(&self, body: Vec<u8>, username: &str, password: &str) -> Result<(), DeliveryError> {
        let result = self
            .http
            .post(self.url.clone())
            .basic_auth(username, Some(password))
            .header(CONTENT_ENCODING, "snappy")
            .header(CONTENT_TYPE, "application/x-protobuf")
            .header(USER_AGENT, AGENT_USER_AGENT)
            .header(REMOTE_WRITE_VERSION_HEADER, REMOTE_WRITE_VERSION)
            .body(body)
            .send()
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(DeliveryError::Build(e.to_string())),
            Err(e) => {
                return Err(DeliveryError::Recoverable {
                    message: e.to_string(),
                    retry_after: DEFAULT_BACKOFF,
                })
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(retry_after_duration)
            .unwrap_or(DEFAULT_BACKOFF);
        // Drain the body so the connection can be reused, keeping only the
        // prefix that can end up in an error message.
        let mut body = Vec::new();
        while let Ok(Some(chunk)) = response.chunk().await {
            let room = MAX_ERR_MSG_LEN - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }

        if status.is_success() {
            return Ok(());
        }

        let message = format!("server returned HTTP status {status}: {}", first_line(&body));
        if status.is_server_error() {
            return Err(DeliveryError::Recoverable {
                message,
                retry_after: DEFAULT_BACKOFF,
            });
        }
        if self.retry_on_rate_limit && status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DeliveryError::Recoverable {
                message,
                retry_after,
            });
        }
        Err(DeliveryError::Permanent(message))
    }
}

fn first_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Backoff for a `Retry-After` header value.
///
/// The value is tried as an HTTP date first, then as a number of seconds.
/// Anything unparsable, and dates in the past, yield a zero backoff.
pub fn retry_after_duration(value: &str) -> Duration {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        let remaining = date.with_timezone(&Utc) - Utc::now();
        return u64::try_from(remaining.num_seconds())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKOFF);
    }
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_BACKOFF)
}
