//! Wire types for the `generateContent` API and the JSON payloads we ask it
//! to produce.
//!
//! Model output is deserialized into strict structs before any field is
//! trusted; a shape mismatch is an error, never a partially filled value.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::news::{Article, CountryNews, GeopoliticalNews};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

// ============================================================================
// Model payloads
// ============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ArticlePayload {
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<ArticlePayload> for Article {
    fn from(p: ArticlePayload) -> Self {
        Article::new(p.title, p.summary, p.url, p.category.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CountryPayload {
    pub country_name: String,
    #[serde(default)]
    pub articles: Vec<ArticlePayload>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeopoliticalPayload {
    pub supporters_of_resistance: Vec<ArticlePayload>,
    pub opponents_of_resistance: Vec<ArticlePayload>,
    pub countries: Vec<CountryPayload>,
}

impl From<GeopoliticalPayload> for GeopoliticalNews {
    fn from(p: GeopoliticalPayload) -> Self {
        GeopoliticalNews {
            supporters: p.supporters_of_resistance.into_iter().map(Article::from).collect(),
            opponents: p.opponents_of_resistance.into_iter().map(Article::from).collect(),
            countries: p
                .countries
                .into_iter()
                .map(|c| CountryNews {
                    country_name: c.country_name,
                    articles: c.articles.into_iter().map(Article::from).collect(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// responseSchema values
// ============================================================================

fn article_schema(category_description: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "The article's title." },
            "summary": { "type": "STRING", "description": "A short, neutral summary of the article." },
            "url": { "type": "STRING", "description": "The URL of the original article." },
            "category": { "type": "STRING", "description": category_description }
        },
        "required": ["title", "summary", "url", "category"]
    })
}

pub(super) fn categorized_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": article_schema("A relevant category for the article.")
    })
}

pub(super) fn geopolitical_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "supporters_of_resistance": {
                "type": "ARRAY",
                "description": "News about groups and countries supporting the Axis of Resistance.",
                "items": article_schema("Must be 'supporters_of_resistance'.")
            },
            "opponents_of_resistance": {
                "type": "ARRAY",
                "description": "News about groups and countries opposing the Axis of Resistance.",
                "items": article_schema("Must be 'opponents_of_resistance'.")
            },
            "countries": {
                "type": "ARRAY",
                "description": "News grouped by specific country.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "countryName": { "type": "STRING", "description": "The country's name." },
                        "articles": {
                            "type": "ARRAY",
                            "items": article_schema("Must be the country's name.")
                        }
                    },
                    "required": ["countryName", "articles"]
                }
            }
        },
        "required": ["supporters_of_resistance", "opponents_of_resistance", "countries"]
    })
}
