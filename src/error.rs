//! Error taxonomy shared by every stage.
//!
//! Variants are grouped by [`ErrorKind`] so callers can react to a class of failure
//! (e.g. "run the previous stage" on `NotFound`) without matching each variant.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Coarse class of a [`PipelineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MalformedInput,
    PolicyViolation,
    Configuration,
    UpstreamSource,
    Io,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{what} not found at {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("invalid JSON in {} at line {line}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid comment record in {} at line {line}", path.display())]
    SchemaViolation {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {row} does not match the silver schema: {reason}")]
    RowShape { row: u64, reason: String },

    #[error("gold stats file {} must hold exactly 1 row, got {rows}", path.display())]
    GoldShape { path: PathBuf, rows: usize },

    #[error("refusing to overwrite existing file {}", path.display())]
    OverwriteRefused { path: PathBuf },

    #[error("unsupported stopwords_lang: {0:?}")]
    UnsupportedStopwordsLang(String),

    #[error("column {column:?} missing or mistyped in {}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp: {0}")]
    Timestamp(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::MalformedRecord { .. }
            | PipelineError::SchemaViolation { .. }
            | PipelineError::RowShape { .. }
            | PipelineError::GoldShape { .. }
            | PipelineError::Json(_)
            | PipelineError::Timestamp(_) => ErrorKind::MalformedInput,
            PipelineError::OverwriteRefused { .. } => ErrorKind::PolicyViolation,
            PipelineError::UnsupportedStopwordsLang(_) | PipelineError::MissingColumn { .. } => {
                ErrorKind::Configuration
            }
            PipelineError::Source(_) => ErrorKind::UpstreamSource,
            PipelineError::Io { .. } | PipelineError::Parquet(_) | PipelineError::Arrow(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        PipelineError::Io { context: context.into(), source }
    }
}

/// Attach a context string to `io::Result`, mirroring anyhow's `with_context`.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| PipelineError::io(f(), e))
    }
}

/// Semantic failures of the upstream comment source.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("comments are disabled for video '{video_id}'")]
    CommentsDisabled { video_id: String },

    #[error("video '{video_id}' was not found (check the video ID/URL)")]
    VideoNotFound { video_id: String },

    #[error("API quota exceeded; try again later or use a different key/project")]
    QuotaExceeded,

    #[error("API key is invalid or lacks permission for this request")]
    AuthInvalid,

    #[error("API error: {message}")]
    Api { message: String },
}

impl SourceError {
    /// Translate an upstream API error `reason` into a semantic kind.
    /// Unknown reasons fall back to [`SourceError::Api`] carrying `message`.
    pub fn from_api_reason(video_id: &str, reason: Option<&str>, message: Option<&str>) -> Self {
        match reason {
            Some("commentsDisabled") => SourceError::CommentsDisabled { video_id: video_id.to_string() },
            Some("videoNotFound") | Some("notFound") => {
                SourceError::VideoNotFound { video_id: video_id.to_string() }
            }
            Some("quotaExceeded") | Some("dailyLimitExceeded") => SourceError::QuotaExceeded,
            Some("keyInvalid") | Some("forbidden") => SourceError::AuthInvalid,
            _ => SourceError::Api {
                message: message.unwrap_or("unknown upstream API error").to_string(),
            },
        }
    }
}
