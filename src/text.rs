//! Text normalization for the silver layer.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_URL_PLACEHOLDER: &str = "<URL>";

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)https?://\S+|www\.\S+").expect("static URL pattern"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"))
}

/// Deterministic cleaning pipeline, applied in order:
/// NFKC → URLs replaced by the placeholder → lowercase → whitespace collapsed and trimmed.
#[derive(Clone, Debug)]
pub struct TextPreprocessor {
    url_placeholder: String,
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self { url_placeholder: DEFAULT_URL_PLACEHOLDER.to_string() }
    }
}

impl TextPreprocessor {
    pub fn new(url_placeholder: impl Into<String>) -> Self {
        Self { url_placeholder: url_placeholder.into() }
    }

    pub fn clean(&self, text: &str) -> String {
        let text: String = text.nfkc().collect();
        let text = url_re().replace_all(&text, regex::NoExpand(&self.url_placeholder));
        let text = text.to_lowercase();
        ws_re().replace_all(&text, " ").trim().to_string()
    }
}
