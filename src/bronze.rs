//! Bronze layer: raw comments as JSONL, one file per video, in source order.

use crate::error::{IoContext, PipelineError, Result};
use crate::models::Comment;
use crate::ndjson::{NdjsonReader, NdjsonWriter};
use crate::paths::bronze_file;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Storage contract for raw comments.
pub trait BronzeStore {
    /// Persist `comments` for `video_id`. `overwrite = true` replaces the file,
    /// `false` appends to it. Returns the file location even when nothing was written.
    fn save<I>(&self, video_id: &str, comments: I, overwrite: bool) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Comment>;

    /// Load every comment saved for `video_id`; empty if nothing was ever saved.
    fn load(&self, video_id: &str) -> Result<Vec<Comment>>;
}

/// File-backed [`BronzeStore`]: `<dir>/<video_id>.jsonl`.
#[derive(Clone, Debug)]
pub struct JsonlBronzeStore {
    dir: PathBuf,
    read_buffer_bytes: usize,
    write_buffer_bytes: usize,
}

impl JsonlBronzeStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), read_buffer_bytes: 64 * 1024, write_buffer_bytes: 64 * 1024 }
    }

    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes;
        self.write_buffer_bytes = write_bytes;
        self
    }

    pub fn path_for(&self, video_id: &str) -> PathBuf {
        bronze_file(&self.dir, video_id)
    }
}

impl BronzeStore for JsonlBronzeStore {
    fn save<I>(&self, video_id: &str, comments: I, overwrite: bool) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Comment>,
    {
        let path = self.path_for(video_id);
        let mut writer = if overwrite {
            NdjsonWriter::create(&path, self.write_buffer_bytes)?
        } else {
            NdjsonWriter::append(&path, self.write_buffer_bytes)?
        };

        let mut written: u64 = 0;
        for c in comments {
            writer.write_line(&serde_json::to_string(&c)?)?;
            written += 1;
        }
        let path = writer.finish_atomic()?;
        tracing::info!(video_id, written, overwrite, "bronze saved to {}", path.display());
        Ok(path)
    }

    fn load(&self, video_id: &str) -> Result<Vec<Comment>> {
        let path = self.path_for(video_id);
        if !path.exists() {
            tracing::debug!(video_id, "no bronze file at {}", path.display());
            return Ok(Vec::new());
        }

        let mut rdr = NdjsonReader::open(&path, self.read_buffer_bytes)
            .io_context(|| format!("open {}", path.display()))?;
        let mut buf = String::with_capacity(4 * 1024);
        let mut comments = Vec::new();
        loop {
            let n = rdr.read_line(&mut buf).io_context(|| format!("read {}", path.display()))?;
            if n == 0 {
                break;
            }
            if buf.trim().is_empty() {
                continue;
            }
            let line = rdr.line_no();
            let value: Value = serde_json::from_str(&buf)
                .map_err(|source| PipelineError::MalformedRecord { path: path.clone(), line, source })?;
            let comment: Comment = serde_json::from_value(value)
                .map_err(|source| PipelineError::SchemaViolation { path: path.clone(), line, source })?;
            comments.push(comment);
        }
        Ok(comments)
    }
}
