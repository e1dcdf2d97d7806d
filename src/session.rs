//! Explicit session context: the current target language and Inoreader
//! credentials, restored from the local store and persisted on change.

use anyhow::Result;

use crate::auth::Credentials;
use crate::language::Language;
use crate::storage::Database;

const LANGUAGE_KEY: &str = "app-language";

pub struct Session {
    db: Database,
    language: Language,
    credentials: Option<Credentials>,
}

impl Session {
    /// Restores the session from the store.
    ///
    /// A persisted language wins over `default_language`; an unreadable one is
    /// ignored with a warning.
    pub async fn restore(db: Database, default_language: Language) -> Result<Self> {
        let language = match db.get_value(LANGUAGE_KEY).await? {
            Some(code) => code.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring persisted language");
                default_language
            }),
            None => default_language,
        };
        let credentials = db.load_credentials().await?;

        tracing::debug!(
            language = %language,
            has_credentials = credentials.is_some(),
            "Session restored"
        );

        Ok(Self {
            db,
            language,
            credentials,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switches the target language and persists the choice.
    pub async fn set_language(&mut self, language: Language) -> Result<()> {
        self.db.set_value(LANGUAGE_KEY, language.code()).await?;
        self.language = language;
        Ok(())
    }

    /// Overrides the language for this session only.
    pub fn override_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Credentials usable for authenticated stream access, if complete.
    pub fn complete_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref().filter(|c| c.is_complete())
    }

    pub async fn set_credentials(&mut self, credentials: Credentials) -> Result<()> {
        self.db.save_credentials(&credentials).await?;
        self.credentials = Some(credentials);
        Ok(())
    }

    /// User-initiated reset; also drops any pending authorization.
    pub async fn clear_credentials(&mut self) -> Result<()> {
        self.db.clear_credentials().await?;
        self.credentials = None;
        Ok(())
    }

    /// Drops credentials the provider rejected with 401/403.
    pub async fn invalidate_credentials(&mut self) -> Result<()> {
        self.db.invalidate_credentials().await?;
        self.credentials = None;
        Ok(())
    }
}
