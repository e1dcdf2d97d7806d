//! newsdigest: feed fetching, OPML extraction, Inoreader streams and
//! AI-categorized news digests with a cached, self-refreshing headlines board.

pub mod ai;
pub mod auth;
pub mod config;
pub mod feed;
pub mod http;
pub mod language;
pub mod news;
pub mod session;
pub mod storage;
pub mod util;
