//! Target languages for summaries and category labels.
//!
//! The language changes the instructed output language of every AI call and
//! keys the headlines cache, so switching language never serves a cache entry
//! produced for another language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Language
// ============================================================================

/// Supported target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fa,
    En,
    Ar,
    Fr,
    De,
    Es,
    Ru,
    Zh,
}

/// Script direction used when rendering a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Unicode mark that pins a line's base direction in a terminal
    /// (U+200F for right-to-left, nothing for left-to-right).
    pub fn line_mark(self) -> &'static str {
        match self {
            Self::Ltr => "",
            Self::Rtl => "\u{200F}",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unsupported language code '{0}' (expected one of: fa, en, ar, fr, de, es, ru, zh)")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub const ALL: [Language; 8] = [
        Self::Fa,
        Self::En,
        Self::Ar,
        Self::Fr,
        Self::De,
        Self::Es,
        Self::Ru,
        Self::Zh,
    ];

    /// ISO 639-1 code, also used as the storage key suffix.
    pub fn code(self) -> &'static str {
        match self {
            Self::Fa => "fa",
            Self::En => "en",
            Self::Ar => "ar",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Es => "es",
            Self::Ru => "ru",
            Self::Zh => "zh",
        }
    }

    /// English name of the language, as written into AI prompts.
    pub fn english_name(self) -> &'static str {
        match self {
            Self::Fa => "Persian (Farsi)",
            Self::En => "English",
            Self::Ar => "Arabic",
            Self::Fr => "French",
            Self::De => "German",
            Self::Es => "Spanish",
            Self::Ru => "Russian",
            Self::Zh => "Simplified Chinese",
        }
    }

    pub fn direction(self) -> TextDirection {
        match self {
            Self::Fa | Self::Ar => TextDirection::Rtl,
            _ => TextDirection::Ltr,
        }
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or(UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
