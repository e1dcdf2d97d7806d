//! On-demand digests: feed URLs or an OPML document in, categorized
//! summaries in the session language out.

use std::sync::Arc;

use super::error::DigestError;
use super::model::CategorizedArticles;
use crate::ai::GeminiClient;
use crate::feed::{extract_feed_urls, FeedFetcher};
use crate::session::Session;

pub struct Digest {
    fetcher: FeedFetcher,
    ai: Arc<GeminiClient>,
}

impl Digest {
    pub fn new(fetcher: FeedFetcher, ai: Arc<GeminiClient>) -> Self {
        Self { fetcher, ai }
    }

    /// Fetches every URL, combines the bodies and categorizes them.
    ///
    /// Blank URLs are dropped. Individual feed failures are logged and
    /// skipped; the call fails only if no feed produced content. If the
    /// provider rejected the session's credentials for any feed, they are
    /// invalidated before returning.
    pub async fn summarize_urls(
        &self,
        session: &mut Session,
        urls: &[String],
    ) -> Result<CategorizedArticles, DigestError> {
        let urls: Vec<String> = urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        let batch = self
            .fetcher
            .fetch_all(&urls, session.complete_credentials().cloned())
            .await;

        if let Some(status) = batch.auth_rejected() {
            tracing::warn!(status = status, "Inoreader rejected stored credentials, clearing them");
            session
                .invalidate_credentials()
                .await
                .map_err(DigestError::Storage)?;
        }

        let combined = batch.into_combined()?;
        if combined.trim().is_empty() {
            return Err(DigestError::EmptyFeed);
        }

        let articles = self
            .ai
            .summarize_and_categorize(&combined, session.language())
            .await?;
        Ok(articles)
    }

    /// Extracts the feed URLs from an OPML document and digests them.
    pub async fn summarize_opml(
        &self,
        session: &mut Session,
        opml: &str,
    ) -> Result<CategorizedArticles, DigestError> {
        let urls = extract_feed_urls(opml)?;
        tracing::info!(feeds = urls.len(), "Summarizing feeds from OPML");
        self.summarize_urls(session, &urls).await
    }
}
