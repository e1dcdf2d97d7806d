use anyhow::{Context, Result};

use super::schema::Database;
use crate::auth::credentials::StoredCredentials;
use crate::auth::Credentials;

const CREDENTIALS_KEY: &str = "inoreader_credentials";
const OAUTH_STATE_KEY: &str = "inoreader_oauth_state";
const TEMP_CREDENTIALS_KEY: &str = "inoreader_temp_credentials";

impl Database {
    // ========================================================================
    // Long-term Credentials
    // ========================================================================

    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(&credentials.to_stored())
            .context("Failed to serialize credentials")?;
        self.set_value(CREDENTIALS_KEY, &json).await
    }

    /// Load stored credentials.
    ///
    /// A blob that no longer parses is removed and reported as absent.
    pub async fn load_credentials(&self) -> Result<Option<Credentials>> {
        let Some(json) = self.get_value(CREDENTIALS_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredCredentials>(&json) {
            Ok(stored) => Ok(Some(stored.into())),
            Err(e) => {
                tracing::warn!(error = %e, "Stored credentials are corrupt, discarding");
                self.remove_value(CREDENTIALS_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Drop the long-term credentials after the provider rejected them
    /// (HTTP 401/403). Any in-flight authorization is left alone.
    pub async fn invalidate_credentials(&self) -> Result<()> {
        self.remove_value(CREDENTIALS_KEY).await
    }

    /// User-initiated reset: long-term credentials plus any pending
    /// authorization state. The news cache is not touched.
    pub async fn clear_credentials(&self) -> Result<()> {
        self.remove_value(CREDENTIALS_KEY).await?;
        self.discard_pending_auth().await
    }

    // ========================================================================
    // OAuth Transient State
    // ========================================================================

    /// Stash the nonce and the client id/secret for an authorization round trip.
    /// Replaces any previous pending authorization.
    pub async fn stash_pending_auth(
        &self,
        state: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<()> {
        let temp = StoredCredentials {
            token: None,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        let json = serde_json::to_string(&temp).context("Failed to serialize temporary credentials")?;
        self.set_value(OAUTH_STATE_KEY, state).await?;
        self.set_value(TEMP_CREDENTIALS_KEY, &json).await
    }

    /// Remove and return the stored nonce.
    pub async fn take_oauth_state(&self) -> Result<Option<String>> {
        self.take_value(OAUTH_STATE_KEY).await
    }

    /// Read the stashed client id/secret without removing them.
    pub async fn pending_auth_credentials(&self) -> Result<Option<(String, String)>> {
        let Some(json) = self.get_value(TEMP_CREDENTIALS_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredCredentials>(&json) {
            Ok(temp) => Ok(Some((temp.client_id, temp.client_secret))),
            Err(e) => {
                tracing::warn!(error = %e, "Temporary credentials are corrupt, discarding");
                self.remove_value(TEMP_CREDENTIALS_KEY).await?;
                Ok(None)
            }
        }
    }

    pub async fn has_pending_auth(&self) -> Result<bool> {
        Ok(self.get_value(OAUTH_STATE_KEY).await?.is_some())
    }

    /// Remove the nonce and temporary credentials.
    pub async fn discard_pending_auth(&self) -> Result<()> {
        self.remove_value(OAUTH_STATE_KEY).await?;
        self.remove_value(TEMP_CREDENTIALS_KEY).await
    }
}
