//! AI categorization client.
//!
//! Feed text goes in, structured articles come out. The model is asked for
//! JSON constrained by a response schema, and the reply is validated against
//! strict types before use.

mod gemini;
mod prompt;
mod schema;

pub use gemini::{
    AiError, GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MAX_INPUT_CHARS, DEFAULT_MODEL,
};
