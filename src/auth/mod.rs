//! Inoreader credentials and the OAuth2 authorization-code flow.

pub(crate) mod credentials;
mod oauth;

pub use credentials::Credentials;
pub use oauth::{AuthError, OAuthConfig, OAuthFlow, DEFAULT_REDIRECT_URI};
