//! Feed acquisition: raw feed text for the categorizer.
//!
//! - [`FeedFetcher`] - concurrent batch fetching with per-URL outcomes
//! - [`resolve_stream_id`] - Inoreader URL → stream identifier
//! - [`is_provider_url`] - routing to the authenticated stream-contents client
//! - [`extract_feed_urls`] - `xmlUrl` extraction from OPML subscription lists

mod fetcher;
mod inoreader;
mod opml;
mod resolver;

pub use fetcher::{
    BatchError, BatchOutcome, FeedFetcher, FeedOutcome, FetchError, FetcherConfig, FEED_SEPARATOR,
};
pub use inoreader::is_provider_url;
pub use opml::{extract_feed_urls, read_opml, OpmlError};
pub use resolver::{resolve_stream_id, ResolveError, READING_LIST_STREAM};
