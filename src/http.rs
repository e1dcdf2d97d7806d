//! Shared HTTP client for feeds, the stream API, OAuth and the AI service.

use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

const MAX_REDIRECTS: usize = 5;

/// Bounded redirect policy with loop detection.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {MAX_REDIRECTS})"));
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Builds the client every component shares. Per-request deadlines are
/// applied by the callers; `timeout` here is the outer bound.
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("newsdigest/", env!("CARGO_PKG_VERSION")))
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .build()
}

/// Failure while reading a response body under a size cap.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Response exceeds {0} bytes")]
    TooLarge(usize),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Reads the whole body, failing as soon as it would exceed `limit` bytes.
///
/// A declared `Content-Length` above the limit fails before any chunk is read.
pub async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ReadError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ReadError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ReadError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
