use super::prompt::{categorize_prompt, geopolitical_prompt};
use super::schema::{
    categorized_schema, geopolitical_schema, ApiErrorBody, ArticlePayload,
    GenerateContentResponse, GeopoliticalPayload,
};
use crate::language::Language;
use crate::news::{Article, CategorizedArticles, GeopoliticalNews};
use crate::http::{read_limited_bytes, ReadError};
use crate::util::{truncate_chars, validate_base_url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 250_000;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("AI service request timed out")]
    Timeout,
    /// Non-2xx status, error payload or blocked prompt, with the provider's message.
    #[error("AI service error: {message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("AI service returned an empty response")]
    EmptyResponse,
    /// Model output was not JSON of the expected shape.
    #[error("Failed to parse AI response: {0}")]
    Malformed(String),
    #[error("AI service response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("No AI API key configured (set GEMINI_API_KEY or ai_api_key in config)")]
    MissingApiKey,
    #[error("Insecure AI base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl From<ReadError> for AiError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::TooLarge(limit) => AiError::ResponseTooLarge(limit),
            ReadError::Network(e) => AiError::Network(e),
        }
    }
}

/// Settings for [`GeminiClient`].
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub max_input_chars: usize,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for Gemini `generateContent` with JSON-schema-constrained output.
///
/// Both operations truncate the feed text to `max_input_chars` characters
/// before sending. Nothing is retried.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    max_input_chars: usize,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiClient {
    /// # Errors
    ///
    /// [`AiError::MissingApiKey`] without a non-blank key, and
    /// [`AiError::InsecureBaseUrl`] for a non-HTTPS base outside localhost.
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;
        let base_url = validate_base_url(&config.base_url).map_err(|_| AiError::InsecureBaseUrl)?;

        if base_url != DEFAULT_BASE_URL {
            tracing::info!(base_url = %base_url, "Using custom AI base URL");
        }

        Ok(Self {
            client,
            base_url,
            model: config.model,
            api_key,
            max_input_chars: config.max_input_chars,
            timeout: config.timeout,
        })
    }

    /// Summarizes every article in `feed_text` and groups them by the
    /// free-form category the model assigns.
    pub async fn summarize_and_categorize(
        &self,
        feed_text: &str,
        language: Language,
    ) -> Result<CategorizedArticles, AiError> {
        let input = self.truncate_input(feed_text);
        let prompt = categorize_prompt(language, &input);

        let payload: Vec<ArticlePayload> = self.generate_json(&prompt, categorized_schema()).await?;
        let articles = CategorizedArticles::from_articles(payload.into_iter().map(Article::from));

        tracing::debug!(
            articles = articles.article_count(),
            categories = articles.groups().len(),
            language = %language,
            "Categorized feed content"
        );
        Ok(articles)
    }

    /// Sorts headline articles into supporters, opponents and per-country groups.
    pub async fn process_geopolitical_feeds(
        &self,
        feed_text: &str,
        language: Language,
    ) -> Result<GeopoliticalNews, AiError> {
        let input = self.truncate_input(feed_text);
        let prompt = geopolitical_prompt(language, &input);

        let payload: GeopoliticalPayload =
            self.generate_json(&prompt, geopolitical_schema()).await?;
        Ok(GeopoliticalNews::from(payload))
    }

    fn truncate_input<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        let truncated = truncate_chars(text, self.max_input_chars);
        if truncated.len() < text.len() {
            tracing::debug!(
                max_chars = self.max_input_chars,
                original_bytes = text.len(),
                "Truncated AI input"
            );
        }
        truncated
    }

    async fn generate_json<T: DeserializeOwned>(&self, prompt: &str, schema: Value) -> Result<T, AiError> {
        let text = self.generate(prompt, schema).await?;
        serde_json::from_str(text.trim()).map_err(|e| AiError::Malformed(e.to_string()))
    }

    /// Sends one prompt and returns the first candidate's text.
    async fn generate(&self, prompt: &str, schema: Value) -> Result<String, AiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });
        let body = serde_json::to_vec(&body).map_err(|e| AiError::Malformed(e.to_string()))?;

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let (status, bytes) = tokio::time::timeout(self.timeout, async {
            let response = request.send().await.map_err(AiError::Network)?;
            let status = response.status();
            let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
            Ok::<_, AiError>((status, bytes))
        })
        .await
        .map_err(|_| AiError::Timeout)??;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .map(|b| b.error.message)
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()));
            return Err(AiError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let response: GenerateContentResponse =
            serde_json::from_slice(&bytes).map_err(|e| AiError::Malformed(e.to_string()))?;

        if let Some(reason) = response.block_reason() {
            return Err(AiError::Upstream {
                status: None,
                message: format!("prompt blocked ({})", reason),
            });
        }

        match response.text() {
            Some(text) => Ok(text),
            None => {
                let finish = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
                    .unwrap_or("none");
                tracing::warn!(finish_reason = %finish, "AI response had no candidate text");
                Err(AiError::EmptyResponse)
            }
        }
    }
}
