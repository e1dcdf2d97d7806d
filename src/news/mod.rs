//! News model, merge-by-URL, the headlines engine and on-demand digests.

mod digest;
mod engine;
mod error;
mod merge;
mod model;

pub use digest::Digest;
pub use engine::{
    BoardSource, CacheState, HeadlinesConfig, HeadlinesEngine, MountedBoard, RefreshHandle,
    DEFAULT_CACHE_TTL, DEFAULT_HEADLINE_FEEDS, DEFAULT_HEADLINE_LIMIT,
};
pub use error::{DigestError, ErrorKind};
pub use merge::merge_by_url;
pub use model::{
    Article, CategorizedArticles, CategoryGroup, CountryNews, GeopoliticalNews, UNCATEGORIZED,
};
