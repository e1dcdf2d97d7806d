use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Inoreader API credentials.
///
/// A set is *complete* only when the token, client id and client secret are
/// all present and non-blank; incomplete sets fall back to anonymous access.
///
/// SEC-015: Custom Debug impl masks the token and client secret.
pub struct Credentials {
    token: Option<SecretString>,
    client_id: String,
    client_secret: SecretString,
}

impl Credentials {
    pub fn new(token: Option<String>, client_id: impl Into<String>, client_secret: String) -> Self {
        Self {
            token: token.map(SecretString::from),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret),
        }
    }

    pub fn is_complete(&self) -> bool {
        let token_present = self
            .token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().trim().is_empty());
        token_present
            && !self.client_id.trim().is_empty()
            && !self.client_secret.expose_secret().trim().is_empty()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose_secret())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }

    pub(crate) fn to_stored(&self) -> StoredCredentials {
        StoredCredentials {
            token: self.token().map(str::to_string),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret().to_string(),
        }
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(
            self.token().map(str::to_string),
            self.client_id.clone(),
            self.client_secret().to_string(),
        )
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Serialized form of [`Credentials`] in the local store.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredCredentials {
    #[serde(default)]
    pub token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
}

impl From<StoredCredentials> for Credentials {
    fn from(stored: StoredCredentials) -> Self {
        Credentials::new(stored.token, stored.client_id, stored.client_secret)
    }
}
