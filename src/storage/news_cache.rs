use anyhow::{Context, Result};

use super::schema::Database;
use super::types::NewsCacheEntry;
use crate::language::Language;
use crate::news::GeopoliticalNews;

impl Database {
    // ========================================================================
    // Headlines Cache Operations
    // ========================================================================

    /// Create or overwrite the cache entry for `language`.
    ///
    /// # Arguments
    ///
    /// * `language` - Cache key; each language has its own entry
    /// * `payload` - The categorization result to persist
    /// * `fetched_at_ms` - Unix epoch milliseconds the payload was produced at
    pub async fn store_news_cache(
        &self,
        language: Language,
        payload: &GeopoliticalNews,
        fetched_at_ms: i64,
    ) -> Result<()> {
        let json = serde_json::to_string(payload).context("Failed to serialize news payload")?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO news_cache (language, payload, fetched_at_ms)
            VALUES (?, ?, ?)
        "#,
        )
        .bind(language.code())
        .bind(&json)
        .bind(fetched_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read the cache entry for `language`, regardless of age.
    ///
    /// Validity against the TTL is the caller's decision. An entry whose
    /// payload no longer deserializes is deleted and reported as missing.
    pub async fn load_news_cache(&self, language: Language) -> Result<Option<NewsCacheEntry>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT payload, fetched_at_ms FROM news_cache WHERE language = ?")
                .bind(language.code())
                .fetch_optional(&self.pool)
                .await?;

        let Some((payload, fetched_at_ms)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<GeopoliticalNews>(&payload) {
            Ok(payload) => Ok(Some(NewsCacheEntry {
                language,
                payload,
                fetched_at_ms,
            })),
            Err(e) => {
                tracing::warn!(language = %language, error = %e, "Failed to load news from cache, discarding entry");
                self.remove_news_cache(language).await?;
                Ok(None)
            }
        }
    }

    pub async fn remove_news_cache(&self, language: Language) -> Result<()> {
        sqlx::query("DELETE FROM news_cache WHERE language = ?")
            .bind(language.code())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
