//! Records flowing through the bronze → silver → gold stages.

use crate::date::PublishedAt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Raw comment as ingested from the source; the bronze unit.
/// Unknown keys in a persisted record are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comment {
    pub video_id: String,
    pub comment_id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub published_at: Option<PublishedAt>,
    #[serde(default)]
    pub is_reply: bool,
}

impl Comment {
    pub fn new(video_id: impl Into<String>, comment_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            comment_id: comment_id.into(),
            text: text.into(),
            author: None,
            like_count: None,
            published_at: None,
            is_reply: false,
        }
    }
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
    pub fn with_like_count(mut self, n: u64) -> Self {
        self.like_count = Some(n);
        self
    }
    pub fn with_published_at(mut self, at: impl Into<PublishedAt>) -> Self {
        self.published_at = Some(at.into());
        self
    }
    pub fn reply(mut self, yes: bool) -> Self {
        self.is_reply = yes;
        self
    }
}

/// Normalized comment; one per bronze [`Comment`]. Both timestamps are UTC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SilverRow {
    pub video_id: String,
    pub comment_id: String,
    pub author: String,
    pub published_at: OffsetDateTime,
    pub like_count: u64,
    pub is_reply: bool,
    pub text_raw: String,
    pub text_clean: String,
    pub preprocess_version: String,
    pub processed_at: OffsetDateTime,
}

/// Tokenization settings for the basic stats; hashed into [`BasicStats::config_hash`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicStatsConfig {
    pub top_n_tokens: usize,
    pub min_token_len: usize,
    pub drop_numeric_tokens: bool,
    pub lowercase: bool,
    pub drop_stopwords: bool,
    pub stopwords_lang: String,
}

impl Default for BasicStatsConfig {
    fn default() -> Self {
        Self {
            top_n_tokens: 30,
            min_token_len: 2,
            drop_numeric_tokens: true,
            lowercase: true,
            drop_stopwords: true,
            stopwords_lang: "en".to_string(),
        }
    }
}

impl BasicStatsConfig {
    pub fn with_top_n_tokens(mut self, n: usize) -> Self {
        self.top_n_tokens = n.max(1);
        self
    }
    pub fn with_min_token_len(mut self, n: usize) -> Self {
        self.min_token_len = n;
        self
    }
    pub fn with_drop_numeric_tokens(mut self, yes: bool) -> Self {
        self.drop_numeric_tokens = yes;
        self
    }
    pub fn with_lowercase(mut self, yes: bool) -> Self {
        self.lowercase = yes;
        self
    }
    pub fn with_drop_stopwords(mut self, yes: bool) -> Self {
        self.drop_stopwords = yes;
        self
    }
    pub fn with_stopwords_lang(mut self, lang: impl Into<String>) -> Self {
        self.stopwords_lang = lang.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopToken {
    pub token: String,
    pub count: u64,
}

impl TopToken {
    pub fn new(token: impl Into<String>, count: u64) -> Self {
        Self { token: token.into(), count }
    }
}

/// Gold summary for one video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicStats {
    pub video_id: String,
    /// Provenance pointer to the silver file the stats were computed from.
    pub silver_path: String,
    pub created_at_utc: OffsetDateTime,
    pub preprocess_version: String,
    pub config_hash: String,
    pub row_count: u64,
    pub empty_text_count: u64,
    pub total_token_count: u64,
    pub unique_token_count: u64,
    /// Count descending; equal counts keep first-seen order.
    pub top_tokens: Vec<TopToken>,
}
