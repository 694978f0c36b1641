//! Frozen stopword tables keyed by language tag.

use crate::error::{PipelineError, Result};
use ahash::AHashSet;
use std::sync::OnceLock;

const EN_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by",
    "for", "from", "has", "have", "he", "her", "hers", "him", "his",
    "i", "if", "in", "into", "is", "it", "its", "me", "my", "not", "of",
    "on", "or", "our", "ours", "she", "so", "that", "the", "their", "theirs",
    "them", "then", "there", "these", "they", "this", "those", "to", "too",
    "up", "us", "was", "we", "were", "what", "when", "where", "which", "who",
    "why", "will", "with", "you", "your", "yours",
];

pub type Stopwords = AHashSet<&'static str>;

/// Languages with a built-in table.
pub const SUPPORTED_LANGS: &[&str] = &["en"];

/// Stopwords for `lang`, built on first use and shared for the process lifetime.
pub fn get_stopwords(lang: &str) -> Result<&'static Stopwords> {
    static EN: OnceLock<Stopwords> = OnceLock::new();
    match lang {
        "en" => Ok(EN.get_or_init(|| EN_STOPWORDS.iter().copied().collect())),
        other => Err(PipelineError::UnsupportedStopwordsLang(other.to_string())),
    }
}
