//! Headlines cache and merge engine.
//!
//! Per language the engine is either **Cold** (no valid cache entry) or
//! **Warm**. Mounting a warm language serves the cached board without any
//! AI call; mounting a cold one runs a blocking fetch-categorize-store cycle.
//! After mounting, a [`RefreshHandle`] re-runs the cycle every TTL and merges
//! each fresh board into the displayed one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::error::DigestError;
use super::model::GeopoliticalNews;
use crate::ai::GeminiClient;
use crate::feed::FeedFetcher;
use crate::language::Language;
use crate::storage::Database;

/// Feeds behind the headlines board.
pub const DEFAULT_HEADLINE_FEEDS: [&str; 5] = [
    "https://english.almayadeen.net/rss",
    "https://english.alarabiya.net/.mrss/en/News.xml",
    "https://www.aljazeera.com/xml/rss/all.xml",
    "https://www.presstv.ir/RSS/MRSS/listings/feed.xml",
    "https://www.jpost.com/rss/rssroutes/newsrss.aspx",
];

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HEADLINE_LIMIT: usize = 15;

#[derive(Debug, Clone)]
pub struct HeadlinesConfig {
    pub feeds: Vec<String>,
    /// Cache validity and refresh period.
    pub ttl: Duration,
    /// Maximum length of the merged supporters/opponents lists.
    pub limit: usize,
}

impl Default for HeadlinesConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_HEADLINE_FEEDS.iter().map(|s| s.to_string()).collect(),
            ttl: DEFAULT_CACHE_TTL,
            limit: DEFAULT_HEADLINE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Cold,
    /// Valid entry, with the time left before it goes stale.
    Warm { remaining: Duration },
}

/// Where a mounted board came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSource {
    Cache,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct MountedBoard {
    pub news: GeopoliticalNews,
    pub source: BoardSource,
}

#[derive(Clone)]
pub struct HeadlinesEngine {
    db: Database,
    fetcher: FeedFetcher,
    ai: Arc<GeminiClient>,
    config: Arc<HeadlinesConfig>,
}

impl HeadlinesEngine {
    pub fn new(db: Database, fetcher: FeedFetcher, ai: Arc<GeminiClient>, config: HeadlinesConfig) -> Self {
        Self {
            db,
            fetcher,
            ai,
            config: Arc::new(config),
        }
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.config.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub async fn cache_state(&self, language: Language) -> Result<CacheState, DigestError> {
        let entry = self
            .db
            .load_news_cache(language)
            .await
            .map_err(DigestError::Storage)?;

        let now_ms = Utc::now().timestamp_millis();
        Ok(match entry {
            Some(e) if e.is_valid(now_ms, self.ttl_ms()) => CacheState::Warm {
                remaining: Duration::from_millis(e.remaining_ms(now_ms, self.ttl_ms()) as u64),
            },
            _ => CacheState::Cold,
        })
    }

    /// Produces the board to show first.
    ///
    /// A valid cache entry is served as-is. Otherwise a fresh cycle runs and
    /// its failure is returned to the caller, since nothing else can be shown.
    pub async fn mount(&self, language: Language) -> Result<MountedBoard, DigestError> {
        let entry = self
            .db
            .load_news_cache(language)
            .await
            .map_err(DigestError::Storage)?;

        let now_ms = Utc::now().timestamp_millis();
        if let Some(entry) = entry.filter(|e| e.is_valid(now_ms, self.ttl_ms())) {
            tracing::debug!(language = %language, age_ms = now_ms - entry.fetched_at_ms, "Serving headlines from cache");
            return Ok(MountedBoard {
                news: entry.payload,
                source: BoardSource::Cache,
            });
        }

        tracing::debug!(language = %language, "Headlines cache cold, fetching");
        let news = self.fetch_fresh(language).await?;
        Ok(MountedBoard {
            news,
            source: BoardSource::Fresh,
        })
    }

    /// Fetches the headline feeds, categorizes them and overwrites the cache
    /// entry for `language`.
    pub async fn fetch_fresh(&self, language: Language) -> Result<GeopoliticalNews, DigestError> {
        let news = self.categorize_headlines(language).await?;

        self.db
            .store_news_cache(language, &news, Utc::now().timestamp_millis())
            .await
            .map_err(DigestError::Storage)?;

        Ok(news)
    }

    async fn categorize_headlines(&self, language: Language) -> Result<GeopoliticalNews, DigestError> {
        let combined = self
            .fetcher
            .fetch_all(&self.config.feeds, None)
            .await
            .into_combined()?;

        Ok(self.ai.process_geopolitical_feeds(&combined, language).await?)
    }

    /// Runs one background cycle and merges its result into `current`.
    ///
    /// Returns the number of newly highlighted articles. On failure `current`
    /// is left unchanged.
    pub async fn refresh(&self, language: Language, current: &mut GeopoliticalNews) -> Result<usize, DigestError> {
        let fresh = self.fetch_fresh(language).await?;
        current.absorb(fresh, self.config.limit);
        Ok(current.new_count())
    }

    /// Starts the periodic refresh loop for `language`, seeded with the
    /// board currently on display. The first cycle runs one TTL from now.
    ///
    /// Background failures are logged and leave the board unchanged.
    pub fn spawn_refresh(&self, language: Language, board: GeopoliticalNews) -> RefreshHandle {
        let (board_tx, board_rx) = watch::channel(board);
        let (cancel_tx, mut cancel_rx) = broadcast::channel::<()>(1);
        let engine = self.clone();
        let period = self.config.ttl;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        tracing::debug!("Headlines refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let result = tokio::select! {
                            biased;
                            _ = cancel_rx.recv() => {
                                tracing::debug!("Headlines refresh stopped mid-cycle");
                                break;
                            }
                            result = engine.categorize_headlines(language) => result,
                        };

                        let fresh = match result {
                            Ok(fresh) => fresh,
                            Err(e) => {
                                tracing::warn!(language = %language, error = %e, "Background headlines refresh failed");
                                continue;
                            }
                        };

                        // A stop that raced the final await still wins: nothing
                        // is stored or published after teardown.
                        if !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty)) {
                            tracing::debug!("Headlines refresh stopped, discarding cycle result");
                            break;
                        }

                        if let Err(e) = engine
                            .db
                            .store_news_cache(language, &fresh, Utc::now().timestamp_millis())
                            .await
                        {
                            tracing::warn!(language = %language, error = %e, "Failed to store headlines cache");
                        }

                        let limit = engine.config.limit;
                        board_tx.send_modify(|board| board.absorb(fresh, limit));
                        let new = board_tx.borrow().new_count();
                        tracing::info!(language = %language, new = new, "Headlines refreshed");
                    }
                }
            }
        });

        RefreshHandle {
            cancel_tx,
            join,
            board: board_rx,
        }
    }
}

/// Owner of a running refresh loop.
///
/// Call [`RefreshHandle::stop`] on teardown. Dropping the handle also ends
/// the loop, abandoning any cycle in flight.
pub struct RefreshHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
    board: watch::Receiver<GeopoliticalNews>,
}

impl RefreshHandle {
    /// Receiver that observes every merged board.
    pub fn subscribe(&self) -> watch::Receiver<GeopoliticalNews> {
        self.board.clone()
    }

    pub fn current(&self) -> GeopoliticalNews {
        self.board.borrow().clone()
    }

    /// Stops the loop and waits for it to exit. A cycle in flight is
    /// abandoned and its result discarded.
    pub async fn stop(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.cancel_tx.send(());
        self.join.await
    }
}
