use super::inoreader::{is_provider_url, StreamClient};
use super::resolver::ResolveError;
use crate::auth::Credentials;
use crate::util::validate_feed_url;
use crate::http::{read_limited_bytes, ReadError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Token placed between feed bodies when a batch is combined.
pub const FEED_SEPARATOR: &str = "\n\n---SEPARATOR---\n\n";

pub(super) const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a single feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("Failed to fetch feed. Status: {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was empty or whitespace only
    #[error("Feed is empty or could not be read.")]
    EmptyBody,
    /// The provider rejected the stored credentials (401/403).
    #[error(
        "Inoreader authentication failed (Status {0}). Your credentials (Token, Client ID, \
         or Client Secret) may be invalid or expired. Please check them and try again."
    )]
    AuthRejected(u16),
    #[error(transparent)]
    UnsupportedStreamUrl(#[from] ResolveError),
    /// Stream API body had no `items` array.
    #[error(
        "Inoreader API returned an unexpected response format. The feed might be empty \
         or there was an issue with the request."
    )]
    UnexpectedFormat,
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
    /// The stream API base would receive tokens over plain HTTP.
    #[error("Insecure Inoreader base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl From<ReadError> for FetchError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::TooLarge(_) => FetchError::ResponseTooLarge,
            ReadError::Network(e) => FetchError::Network(e),
        }
    }
}

/// Error for a batch where no feed produced content.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No feed URLs were provided.")]
    NoUrls,
    /// A single-URL batch keeps the precise cause.
    #[error(transparent)]
    Feed(FetchError),
    #[error(
        "Inoreader authentication failed (Status {0}). Stored credentials were rejected \
         and have been cleared."
    )]
    CredentialsRejected(u16),
    #[error(
        "Could not fetch any of the {0} feeds. This may be due to failed requests or \
         private Inoreader feeds requiring credentials."
    )]
    NoFeedsAvailable(usize),
}

/// Outcome of one URL within a batch.
#[derive(Debug)]
pub struct FeedOutcome {
    pub url: String,
    pub result: Result<String, FetchError>,
}

/// Per-URL outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<FeedOutcome>,
}

impl BatchOutcome {
    /// Successful bodies in input order.
    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(String::as_str))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.url.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.bodies().count()
    }

    /// Status of the first 401/403 rejection in the batch, if any.
    pub fn auth_rejected(&self) -> Option<u16> {
        self.failures().find_map(|(_, e)| match e {
            FetchError::AuthRejected(status) => Some(*status),
            _ => None,
        })
    }

    /// Joins the successful bodies with [`FEED_SEPARATOR`].
    ///
    /// # Errors
    ///
    /// Fails only when no URL produced content.
    pub fn into_combined(self) -> Result<String, BatchError> {
        if self.outcomes.is_empty() {
            return Err(BatchError::NoUrls);
        }

        if self.success_count() > 0 {
            return Ok(self.bodies().collect::<Vec<_>>().join(FEED_SEPARATOR));
        }

        let attempted = self.outcomes.len();
        let rejected = self.auth_rejected();
        let mut outcomes = self.outcomes;

        if attempted == 1 {
            if let Some(Err(e)) = outcomes.pop().map(|o| o.result) {
                return Err(BatchError::Feed(e));
            }
        }

        match rejected {
            Some(status) => Err(BatchError::CredentialsRejected(status)),
            None => Err(BatchError::NoFeedsAvailable(attempted)),
        }
    }
}

/// Settings for [`FeedFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Pass-through relay; `None` fetches feeds directly.
    pub proxy_url: Option<String>,
    pub inoreader_base_url: String,
    pub stream_item_count: u32,
    pub timeout: Duration,
}

/// Fetches raw feed text, routing provider URLs through the stream API when
/// complete credentials are available and everything else through the relay.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    proxy_url: Option<String>,
    timeout: Duration,
    stream: StreamClient,
}

impl FeedFetcher {
    /// # Errors
    ///
    /// [`FetchError::InsecureBaseUrl`] if `inoreader_base_url` is not HTTPS
    /// (plain HTTP is accepted for localhost only).
    pub fn new(client: reqwest::Client, config: FetcherConfig) -> Result<Self, FetchError> {
        let stream = StreamClient::new(
            client.clone(),
            &config.inoreader_base_url,
            config.stream_item_count,
            config.timeout,
        )?;
        Ok(Self {
            client,
            proxy_url: config
                .proxy_url
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            timeout: config.timeout,
            stream,
        })
    }

    /// Fetches every URL concurrently and returns one outcome per URL.
    ///
    /// Never short-circuits: a failing URL is logged and recorded, and the
    /// remaining fetches still complete. Outcomes keep input order.
    ///
    /// Each fetch owns its URL and a shared handle to the credentials, so the
    /// returned future can run on a spawned task.
    pub async fn fetch_all(&self, urls: &[String], credentials: Option<Credentials>) -> BatchOutcome {
        let fetcher = self.clone();
        let credentials = credentials.map(Arc::new);

        let outcomes: Vec<FeedOutcome> = futures::stream::iter(urls.to_vec())
            .map(move |url| {
                let fetcher = fetcher.clone();
                let credentials = credentials.clone();
                async move {
                    let result = fetcher.fetch_one(&url, credentials.as_deref()).await;
                    if let Err(e) = &result {
                        tracing::warn!(url = %url, error = %e, "Feed fetch failed");
                    }
                    FeedOutcome { url, result }
                }
            })
            .buffered(10)
            .collect()
            .await;

        tracing::debug!(
            total = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            "Feed batch finished"
        );

        BatchOutcome { outcomes }
    }

    /// Fetches one feed and returns its body text.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for an invalid URL, transport failure, non-2xx
    /// status, oversize or empty body. Nothing is retried.
    pub async fn fetch_one(&self, url: &str, credentials: Option<&Credentials>) -> Result<String, FetchError> {
        let parsed = validate_feed_url(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let provider = is_provider_url(parsed.as_str());

        let body = match credentials.filter(|c| c.is_complete()) {
            Some(creds) if provider => self.stream.fetch(parsed.as_str(), creds).await?,
            _ => {
                let result = self.fetch_public(parsed.as_str()).await;
                if provider {
                    if let Err(FetchError::HttpStatus(status)) = &result {
                        tracing::warn!(
                            url = %url,
                            status = status,
                            "Inoreader feed might be private; add full credentials to access it"
                        );
                    }
                }
                result?
            }
        };

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(body)
    }

    async fn fetch_public(&self, url: &str) -> Result<String, FetchError> {
        let target = match &self.proxy_url {
            Some(proxy) => format!("{}?{}", proxy, urlencoding::encode(url)),
            None => url.to_string(),
        };

        let bytes = tokio::time::timeout(self.timeout, async {
            let response = self
                .client
                .get(&target)
                .send()
                .await
                .map_err(FetchError::Network)?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            Ok(read_limited_bytes(response, MAX_FEED_SIZE).await?)
        })
        .await
        .map_err(|_| FetchError::Timeout)??;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_A: &str = "<rss><channel><item><title>A</title></item></channel></rss>";
    const RSS_C: &str = "<rss><channel><item><title>C</title></item></channel></rss>";

    fn direct_fetcher(server: &MockServer) -> FeedFetcher {
        FeedFetcher::new(
            reqwest::Client::new(),
            FetcherConfig {
                proxy_url: None,
                inoreader_base_url: server.uri(),
                stream_item_count: 50,
                timeout: Duration::from_secs(5),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_single_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_A))
            .mount(&server)
            .await;

        let body = direct_fetcher(&server)
            .fetch_one(&format!("{}/a", server.uri()), None)
            .await
            .unwrap();
        assert_eq!(body, RSS_A);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_A))
            .mount(&server)
            .await;
        Mock::given(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_C))
            .mount(&server)
            .await;

        let urls: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|p| format!("{}/{}", server.uri(), p))
            .collect();
        let batch = direct_fetcher(&server).fetch_all(&urls, None).await;

        assert_eq!(batch.outcomes.len(), 3);
        assert!(matches!(batch.outcomes[1].result, Err(FetchError::HttpStatus(500))));
        assert_eq!(batch.bodies().collect::<Vec<_>>(), vec![RSS_A, RSS_C]);
        assert_eq!(
            batch.into_combined().unwrap(),
            format!("{RSS_A}{FEED_SEPARATOR}{RSS_C}")
        );
    }

    #[tokio::test]
    async fn test_whitespace_body_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n "))
            .mount(&server)
            .await;

        let err = direct_fetcher(&server)
            .fetch_one(&format!("{}/empty", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }

    #[tokio::test]
    async fn test_all_failed_multi_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = vec![format!("{}/x", server.uri()), format!("{}/y", server.uri())];
        let err = direct_fetcher(&server)
            .fetch_all(&urls, None)
            .await
            .into_combined()
            .unwrap_err();
        assert!(matches!(err, BatchError::NoFeedsAvailable(2)), "{err:?}");
    }

    #[tokio::test]
    async fn test_single_url_failure_keeps_cause() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let urls = vec![format!("{}/x", server.uri())];
        let err = direct_fetcher(&server)
            .fetch_all(&urls, None)
            .await
            .into_combined()
            .unwrap_err();
        assert!(matches!(err, BatchError::Feed(FetchError::HttpStatus(502))), "{err:?}");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let server = MockServer::start().await;
        let err = direct_fetcher(&server)
            .fetch_all(&[], None)
            .await
            .into_combined()
            .unwrap_err();
        assert!(matches!(err, BatchError::NoUrls));
    }

    #[tokio::test]
    async fn test_invalid_scheme_rejected_without_request() {
        let server = MockServer::start().await;
        let err = direct_fetcher(&server)
            .fetch_one("ftp://example.com/feed", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_proxy_receives_encoded_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/"))
            .and(wiremock::matchers::query_param(
                "https://feeds.example/rss?x=1",
                "",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS_A))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = FeedFetcher::new(
            reqwest::Client::new(),
            FetcherConfig {
                proxy_url: Some(format!("{}/relay/", server.uri())),
                inoreader_base_url: server.uri(),
                stream_item_count: 50,
                timeout: Duration::from_secs(5),
            },
        )
        .unwrap();

        let body = fetcher
            .fetch_one("https://feeds.example/rss?x=1", None)
            .await
            .unwrap();
        assert_eq!(body, RSS_A);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RSS_A)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = FeedFetcher::new(
            reqwest::Client::new(),
            FetcherConfig {
                proxy_url: None,
                inoreader_base_url: server.uri(),
                stream_item_count: 50,
                timeout: Duration::from_millis(50),
            },
        )
        .unwrap();

        let err = fetcher
            .fetch_one(&format!("{}/slow", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[test]
    fn test_plain_http_stream_base_refused() {
        let result = FeedFetcher::new(
            reqwest::Client::new(),
            FetcherConfig {
                proxy_url: None,
                inoreader_base_url: "http://inoreader.example".into(),
                stream_item_count: 50,
                timeout: Duration::from_secs(5),
            },
        );
        assert!(matches!(result, Err(FetchError::InsecureBaseUrl)));
    }

    #[test]
    fn test_https_stream_base_accepted() {
        let result = FeedFetcher::new(
            reqwest::Client::new(),
            FetcherConfig {
                proxy_url: None,
                inoreader_base_url: "https://www.inoreader.com/".into(),
                stream_item_count: 50,
                timeout: Duration::from_secs(5),
            },
        );
        assert!(result.is_ok());
    }
}
