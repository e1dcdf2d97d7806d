use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// A base URL that receives credentials is not HTTPS.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Validates a feed URL before it is handed to the relay or fetched directly.
///
/// Only `http` and `https` are accepted. Hosts are not filtered: every fetch
/// goes out through the configured relay, which is the one deciding what it
/// will reach.
///
/// # Examples
///
/// ```
/// use newsdigest::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// assert!(validate_feed_url("not a url").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validates the base URL of a service that receives secrets (API keys,
/// client secrets, bearer tokens).
///
/// SEC-002: HTTPS is required. Plain HTTP is allowed only for
/// `localhost` / `127.0.0.1`, which is what the test suites point at.
/// Returns the base with any trailing `/` removed.
pub fn validate_base_url(base: &str) -> Result<String, UrlValidationError> {
    let trimmed = base.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
            if !is_localhost {
                tracing::error!(base_url = %trimmed, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(UrlValidationError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %trimmed, "Using non-HTTPS base URL (localhost only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(trimmed.to_string())
}
