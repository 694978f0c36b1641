//! Comment sources and the scrape stage (source → bronze).

use crate::bronze::BronzeStore;
use crate::date::now_utc;
use crate::error::{Result, SourceError};
use crate::models::Comment;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Anything that can produce the raw comments of a video.
pub trait CommentSource {
    fn fetch_comments(&self, video_id: &str) -> std::result::Result<Vec<Comment>, SourceError>;
}

/// Offline source yielding three fixed comments per video.
#[derive(Clone, Debug, Default)]
pub struct StubSource {
    fixed_now: Option<OffsetDateTime>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp every comment with `at` instead of the current time.
    pub fn with_fixed_now(mut self, at: OffsetDateTime) -> Self {
        self.fixed_now = Some(at);
        self
    }
}

impl CommentSource for StubSource {
    fn fetch_comments(&self, video_id: &str) -> std::result::Result<Vec<Comment>, SourceError> {
        let now = self.fixed_now.unwrap_or_else(now_utc);
        Ok(vec![
            Comment::new(video_id, "c1", "This is a dummy top-level comment.")
                .with_author("dummy_user_1")
                .with_like_count(3)
                .with_published_at(now),
            Comment::new(video_id, "c2", "Another dummy top-level comment.")
                .with_author("dummy_user_2")
                .with_like_count(0)
                .with_published_at(now),
            Comment::new(video_id, "r1", "This is a dummy reply to a comment.")
                .with_author("dummy_user_3")
                .with_published_at(now)
                .reply(true),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapeResult {
    pub video_id: String,
    pub saved_count: usize,
    pub path: PathBuf,
}

/// Pulls comments from a [`CommentSource`] and persists them to bronze.
pub struct ScrapeService<S, B> {
    source: S,
    bronze: B,
    limit: Option<usize>,
}

impl<S: CommentSource, B: BronzeStore> ScrapeService<S, B> {
    pub fn new(source: S, bronze: B) -> Self {
        Self { source, bronze, limit: None }
    }

    /// Keep at most `n` comments per video, in source order.
    pub fn with_limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn run(&self, video_id: &str, overwrite: bool) -> Result<ScrapeResult> {
        let mut comments = self.source.fetch_comments(video_id)?;
        if let Some(n) = self.limit {
            comments.truncate(n);
        }
        let saved_count = comments.len();
        let path = self.bronze.save(video_id, comments, overwrite)?;
        tracing::info!(video_id, saved_count, "scraped comments into {}", path.display());
        Ok(ScrapeResult { video_id: video_id.to_string(), saved_count, path })
    }
}

impl<T: CommentSource + ?Sized> CommentSource for &T {
    fn fetch_comments(&self, video_id: &str) -> std::result::Result<Vec<Comment>, SourceError> {
        (**self).fetch_comments(video_id)
    }
}
