//! Inoreader OAuth2 authorization-code flow.
//!
//! `begin_auth` mints a nonce and stashes the client id/secret; the user
//! authorizes in a browser and pastes back the URL they were redirected to;
//! `complete_auth` validates it and exchanges the code for a token. The
//! stashed nonce and client values are removed after every completion
//! attempt, whatever the outcome.

use super::Credentials;
use crate::http::{read_limited_bytes, ReadError};
use crate::storage::Database;
use crate::util::validate_base_url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8999/callback";

const MAX_TOKEN_RESPONSE_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client ID and Client Secret are required to generate the authentication link.")]
    MissingClientCredentials,
    #[error("Please paste the full URL from the page you were redirected to.")]
    MissingRedirectUrl,
    #[error("The redirect URL could not be parsed: {0}")]
    InvalidRedirectUrl(String),
    #[error("Inoreader returned an error: {error} - {description}")]
    ProviderDenied { error: String, description: String },
    #[error(
        "Authentication failed: State mismatch. This could indicate a security issue. \
         Please try generating the authentication link again."
    )]
    StateMismatch,
    #[error("Authentication failed: Could not find the authorization code in the provided URL.")]
    MissingCode,
    #[error(
        "Authentication failed: Could not find temporary credentials. \
         Please generate the authentication link again."
    )]
    MissingTemporaryCredentials,
    #[error("Inoreader authentication failed: {0}")]
    TokenExchange(String),
    #[error("Token request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Token request timed out")]
    Timeout,
    #[error("Insecure Inoreader base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Credential store error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl From<ReadError> for AuthError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::TooLarge(_) => AuthError::TokenExchange("Token response too large".into()),
            ReadError::Network(e) => AuthError::Network(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Settings for [`OAuthFlow`].
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub base_url: String,
    pub redirect_uri: String,
    pub timeout: Duration,
}

pub struct OAuthFlow {
    client: reqwest::Client,
    db: Database,
    base_url: String,
    redirect_uri: String,
    timeout: Duration,
}

impl OAuthFlow {
    pub fn new(client: reqwest::Client, db: Database, config: OAuthConfig) -> Result<Self, AuthError> {
        let base_url = validate_base_url(&config.base_url).map_err(|_| AuthError::InsecureBaseUrl)?;
        Ok(Self {
            client,
            db,
            base_url,
            redirect_uri: config.redirect_uri,
            timeout: config.timeout,
        })
    }

    /// Starts an authorization round trip and returns the URL to open.
    ///
    /// Any previously pending authorization is replaced.
    pub async fn begin_auth(&self, client_id: &str, client_secret: &str) -> Result<String, AuthError> {
        let client_id = client_id.trim();
        let client_secret = client_secret.trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(AuthError::MissingClientCredentials);
        }

        let state = uuid::Uuid::new_v4().to_string();
        self.db
            .stash_pending_auth(&state, client_id, client_secret)
            .await
            .map_err(AuthError::Storage)?;

        let mut url = Url::parse(&format!("{}/oauth2/auth", self.base_url))
            .map_err(|e| AuthError::InvalidRedirectUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "read")
            .append_pair("state", &state);

        tracing::debug!("Minted OAuth state for a new authorization");
        Ok(url.into())
    }

    /// Finishes the round trip from the pasted redirect URL.
    ///
    /// On success the new credentials are saved and returned. On failure the
    /// long-term credentials are left untouched. Either way the pending
    /// nonce and temporary credentials are removed.
    pub async fn complete_auth(&self, redirect_url: &str) -> Result<Credentials, AuthError> {
        let result = self.try_complete(redirect_url).await;

        if let Err(e) = self.db.discard_pending_auth().await {
            tracing::warn!(error = %e, "Failed to discard pending OAuth state");
        }

        match &result {
            Ok(_) => tracing::info!("Inoreader authentication succeeded"),
            Err(e) => tracing::warn!(error = %e, "Inoreader authentication failed"),
        }
        result
    }

    async fn try_complete(&self, redirect_url: &str) -> Result<Credentials, AuthError> {
        let redirect_url = redirect_url.trim();
        if redirect_url.is_empty() {
            return Err(AuthError::MissingRedirectUrl);
        }

        let parsed =
            Url::parse(redirect_url).map_err(|e| AuthError::InvalidRedirectUrl(e.to_string()))?;
        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = param("error") {
            return Err(AuthError::ProviderDenied {
                error,
                description: param("error_description")
                    .unwrap_or_else(|| "No description provided.".to_string()),
            });
        }

        let stored_state = self.db.take_oauth_state().await.map_err(AuthError::Storage)?;
        match (param("state"), stored_state) {
            (Some(returned), Some(stored)) if returned == stored => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let code = param("code")
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let (client_id, client_secret) = self
            .db
            .pending_auth_credentials()
            .await
            .map_err(AuthError::Storage)?
            .ok_or(AuthError::MissingTemporaryCredentials)?;

        let token = self.exchange_code(&code, &client_id, &client_secret).await?;

        let credentials = Credentials::new(Some(token), client_id, client_secret);
        self.db
            .save_credentials(&credentials)
            .await
            .map_err(AuthError::Storage)?;
        Ok(credentials)
    }

    async fn exchange_code(&self, code: &str, client_id: &str, client_secret: &str) -> Result<String, AuthError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("code", code)
            .append_pair("client_id", client_id)
            .append_pair("client_secret", client_secret)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("grant_type", "authorization_code")
            .finish();

        let request = self
            .client
            .post(format!("{}/oauth2/token", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(form);

        let (status, bytes) = tokio::time::timeout(self.timeout, async {
            let response = request.send().await.map_err(AuthError::Network)?;
            let status = response.status();
            let bytes = read_limited_bytes(response, MAX_TOKEN_RESPONSE_SIZE).await?;
            Ok::<_, AuthError>((status, bytes))
        })
        .await
        .map_err(|_| AuthError::Timeout)??;

        let body: Option<TokenResponse> = serde_json::from_slice(&bytes).ok();

        if let Some(TokenResponse {
            error: Some(error),
            error_description,
            ..
        }) = &body
        {
            return Err(AuthError::TokenExchange(
                error_description.clone().unwrap_or_else(|| error.clone()),
            ));
        }

        if !status.is_success() {
            return Err(AuthError::TokenExchange(format!(
                "Failed to exchange code for token. Status: {}",
                status.as_u16()
            )));
        }

        body.and_then(|b| b.access_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::TokenExchange("Token response did not contain an access token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn flow(server: &MockServer) -> (OAuthFlow, Database) {
        let db = Database::open(":memory:").await.unwrap();
        let flow = OAuthFlow::new(
            reqwest::Client::new(),
            db.clone(),
            OAuthConfig {
                base_url: server.uri(),
                redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
                timeout: Duration::from_secs(5),
            },
        )
        .unwrap();
        (flow, db)
    }

    fn state_of(auth_url: &str) -> String {
        Url::parse(auth_url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_begin_builds_authorization_url() {
        let server = MockServer::start().await;
        let (flow, db) = flow(&server).await;

        let url = flow.begin_auth("my-id", "my-secret").await.unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.path(), "/oauth2/auth");
        assert_eq!(pairs[0], ("client_id".into(), "my-id".into()));
        assert_eq!(pairs[1], ("redirect_uri".into(), DEFAULT_REDIRECT_URI.into()));
        assert_eq!(pairs[2], ("response_type".into(), "code".into()));
        assert_eq!(pairs[3], ("scope".into(), "read".into()));
        assert_eq!(pairs[4].0, "state");
        assert!(db.has_pending_auth().await.unwrap());
    }

    #[tokio::test]
    async fn test_begin_rejects_blank_inputs() {
        let server = MockServer::start().await;
        let (flow, db) = flow(&server).await;

        let err = flow.begin_auth("  ", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingClientCredentials));
        assert!(!db.has_pending_auth().await.unwrap());
    }

    #[tokio::test]
    async fn test_each_begin_mints_fresh_state() {
        let server = MockServer::start().await;
        let (flow, _db) = flow(&server).await;

        let a = state_of(&flow.begin_auth("id", "secret").await.unwrap());
        let b = state_of(&flow.begin_auth("id", "secret").await.unwrap());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_complete_exchanges_code_and_saves() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_id=my-id"))
            .and(body_string_contains("client_secret=my-secret"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%3A8999%2Fcallback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-token",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (flow, db) = flow(&server).await;
        let state = state_of(&flow.begin_auth("my-id", "my-secret").await.unwrap());

        let creds = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?code=the-code&state={state}"))
            .await
            .unwrap();
        assert_eq!(creds.token(), Some("new-token"));

        let stored = db.load_credentials().await.unwrap().unwrap();
        assert_eq!(stored.token(), Some("new-token"));
        assert_eq!(stored.client_id(), "my-id");
        assert!(stored.is_complete());
        assert!(!db.has_pending_auth().await.unwrap());
        assert!(db.pending_auth_credentials().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_mismatch_cleans_up_and_keeps_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (flow, db) = flow(&server).await;
        db.save_credentials(&Credentials::new(Some("old".into()), "id", "secret".into()))
            .await
            .unwrap();
        flow.begin_auth("my-id", "my-secret").await.unwrap();

        let err = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?code=c&state=forged"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
        assert!(!db.has_pending_auth().await.unwrap());
        assert!(db.pending_auth_credentials().await.unwrap().is_none());
        assert_eq!(db.load_credentials().await.unwrap().unwrap().token(), Some("old"));
    }

    #[tokio::test]
    async fn test_missing_stored_state_is_mismatch() {
        let server = MockServer::start().await;
        let (flow, _db) = flow(&server).await;

        let err = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?code=c&state=anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn test_missing_code() {
        let server = MockServer::start().await;
        let (flow, db) = flow(&server).await;
        let state = state_of(&flow.begin_auth("id", "secret").await.unwrap());

        let err = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?state={state}"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCode));
        assert!(!db.has_pending_auth().await.unwrap());
    }

    #[tokio::test]
    async fn test_provider_error_reported() {
        let server = MockServer::start().await;
        let (flow, db) = flow(&server).await;
        flow.begin_auth("id", "secret").await.unwrap();

        let err = flow
            .complete_auth(&format!(
                "{DEFAULT_REDIRECT_URI}?error=access_denied&error_description=User+declined"
            ))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Inoreader returned an error: access_denied - User declined"
        );
        assert!(!db.has_pending_auth().await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_and_unparseable_input() {
        let server = MockServer::start().await;
        let (flow, _db) = flow(&server).await;

        assert!(matches!(
            flow.complete_auth("   ").await.unwrap_err(),
            AuthError::MissingRedirectUrl
        ));
        assert!(matches!(
            flow.complete_auth("not a url").await.unwrap_err(),
            AuthError::InvalidRedirectUrl(_)
        ));
    }

    #[tokio::test]
    async fn test_token_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Code expired"
            })))
            .mount(&server)
            .await;

        let (flow, db) = flow(&server).await;
        let state = state_of(&flow.begin_auth("id", "secret").await.unwrap());

        let err = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?code=c&state={state}"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Inoreader authentication failed: Code expired");
        assert!(db.load_credentials().await.unwrap().is_none());
        assert!(!db.has_pending_auth().await.unwrap());
    }

    #[tokio::test]
    async fn test_token_non_json_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let (flow, _db) = flow(&server).await;
        let state = state_of(&flow.begin_auth("id", "secret").await.unwrap());

        let err = flow
            .complete_auth(&format!("{DEFAULT_REDIRECT_URI}?code=c&state={state}"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Status: 502"), "{err}");
    }

    #[tokio::test]
    async fn test_insecure_base_rejected() {
        let db = Database::open(":memory:").await.unwrap();
        let result = OAuthFlow::new(
            reqwest::Client::new(),
            db,
            OAuthConfig {
                base_url: "http://www.inoreader.com".into(),
                redirect_uri: DEFAULT_REDIRECT_URI.into(),
                timeout: Duration::from_secs(5),
            },
        );
        assert!(matches!(result, Err(AuthError::InsecureBaseUrl)));
    }
}
