//! Utility functions shared across the crate.
//!
//! - **URL validation**: scheme checks for feed URLs and HTTPS enforcement for
//!   service base URLs that receive secrets
//! - **Text processing**: character-boundary-safe truncation and terminal sanitising

mod text;
mod url_validator;

pub use text::{strip_control_chars, truncate_chars};
pub use url_validator::{validate_base_url, validate_feed_url, UrlValidationError};
