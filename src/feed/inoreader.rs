//! Authenticated access to the Inoreader stream-contents API.
//!
//! Stream items are rewritten into a minimal RSS document so that the
//! categorizer sees the same shape it gets from public feeds.

use super::fetcher::{FetchError, MAX_FEED_SIZE};
use crate::http::read_limited_bytes;
use crate::util::validate_base_url;
use super::resolver::{encode_stream_id, resolve_stream_id};
use crate::auth::Credentials;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Host suffix identifying feed URLs that belong to the provider.
const PROVIDER_HOST: &str = "inoreader.com";

/// Returns true if `url` points at the provider's web UI or API.
pub fn is_provider_url(url: &str) -> bool {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .is_some_and(|host| host == PROVIDER_HOST || host.ends_with(".inoreader.com"))
}

#[derive(Debug, Deserialize)]
struct StreamContents {
    items: Option<Vec<StreamItem>>,
}

#[derive(Debug, Deserialize)]
struct StreamItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: Option<ItemSummary>,
    #[serde(default)]
    canonical: Vec<ItemLink>,
}

#[derive(Debug, Deserialize)]
struct ItemSummary {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ItemLink {
    href: Option<String>,
}

/// Client for `{base}/reader/api/0/stream/contents/{id}`.
#[derive(Clone)]
pub struct StreamClient {
    client: reqwest::Client,
    base_url: String,
    item_count: u32,
    timeout: Duration,
}

impl StreamClient {
    /// Bearer tokens and app keys go to `base_url`, so it must be HTTPS
    /// outside localhost.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        item_count: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = validate_base_url(base_url).map_err(|_| FetchError::InsecureBaseUrl)?;
        Ok(Self {
            client,
            base_url,
            item_count,
            timeout,
        })
    }

    /// Fetches the stream behind a provider URL and renders it as RSS text.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnsupportedStreamUrl`] if the URL shape is not recognised
    /// - [`FetchError::AuthRejected`] on 401/403; callers must drop the stored token
    /// - [`FetchError::HttpStatus`] on any other non-2xx status
    /// - [`FetchError::UnexpectedFormat`] if the body has no `items` array
    pub async fn fetch(&self, feed_url: &str, credentials: &Credentials) -> Result<String, FetchError> {
        let stream_id = resolve_stream_id(feed_url)?;
        let api_url = format!(
            "{}/reader/api/0/stream/contents/{}?n={}",
            self.base_url,
            encode_stream_id(&stream_id),
            self.item_count
        );

        let token = credentials.token().unwrap_or_default();

        let request = self
            .client
            .get(&api_url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
            .header("AppId", credentials.client_id())
            .header("AppKey", credentials.client_secret());

        let bytes = tokio::time::timeout(self.timeout, async {
            let response = request.send().await.map_err(FetchError::Network)?;
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(FetchError::AuthRejected(status.as_u16()));
            }
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }
            Ok(read_limited_bytes(response, MAX_FEED_SIZE).await?)
        })
        .await
        .map_err(|_| FetchError::Timeout)??;

        let contents: StreamContents =
            serde_json::from_slice(&bytes).map_err(|_| FetchError::UnexpectedFormat)?;
        let items = contents.items.ok_or(FetchError::UnexpectedFormat)?;

        tracing::debug!(stream = %stream_id, items = items.len(), "Fetched provider stream");
        Ok(render_rss(&items))
    }
}

fn render_rss(items: &[StreamItem]) -> String {
    let body = items.iter().map(render_item).collect::<Vec<_>>().join("\n");
    format!("<rss><channel>{}</channel></rss>", body)
}

fn render_item(item: &StreamItem) -> String {
    let summary_html = item.summary.as_ref().map(|s| s.content.as_str()).unwrap_or("");
    let summary_text = html2text::from_read(summary_html.as_bytes(), usize::MAX);
    let link = item
        .canonical
        .first()
        .and_then(|l| l.href.as_deref())
        .filter(|href| !href.trim().is_empty())
        .unwrap_or("#");

    format!(
        "<item>\n  <title><![CDATA[{}]]></title>\n  <link>{}</link>\n  <description><![CDATA[{}]]></description>\n</item>",
        cdata(&item.title),
        quick_xml::escape::escape(link),
        cdata(summary_text.trim())
    )
}

/// Splits any `]]>` so the text cannot terminate its CDATA section early.
fn cdata(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}
