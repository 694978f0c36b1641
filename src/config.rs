use crate::silver::DEFAULT_BATCH_SIZE;
use crate::text::DEFAULT_URL_PLACEHOLDER;
use std::path::{Path, PathBuf};

pub const ENV_DATA_ROOT: &str = "YT_COMMENTS_DATA_ROOT";
pub const ENV_BATCH_SIZE: &str = "YT_COMMENTS_BATCH_SIZE";

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub data_root: PathBuf,
    pub batch_size: usize,            // rows per silver flush / stats scan batch
    pub overwrite: bool,              // bronze: replace vs append; silver: replace vs refuse
    pub progress: bool,               // show progress bars
    pub parallelism: Option<usize>,   // Some(N) to set rayon threads, None to use default
    pub url_placeholder: String,
    pub scrape_limit: Option<usize>,  // max comments kept per video on scrape

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity
    pub write_buffer_bytes: usize,    // BufWriter capacity
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            batch_size: DEFAULT_BATCH_SIZE,
            overwrite: true,
            progress: false,
            parallelism: None,
            url_placeholder: DEFAULT_URL_PLACEHOLDER.to_string(),
            scrape_limit: None,
            read_buffer_bytes: 64 * 1024,
            write_buffer_bytes: 64 * 1024,
        }
    }
}

impl PipelineOptions {
    /// Defaults overlaid with `YT_COMMENTS_DATA_ROOT` / `YT_COMMENTS_BATCH_SIZE`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|k| std::env::var(k).ok())
    }

    /// Overlay values looked up through `get`; unparsable values are logged and ignored.
    pub fn with_env_overrides(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = get(ENV_DATA_ROOT).filter(|s| !s.trim().is_empty()) {
            self = self.with_data_root(root.trim());
        }
        if let Some(raw) = get(ENV_BATCH_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(n) => self = self.with_batch_size(n),
                Err(e) => tracing::warn!("ignoring {ENV_BATCH_SIZE}={raw:?}: {e}"),
            }
        }
        self
    }

    pub fn with_data_root(mut self, root: impl AsRef<Path>) -> Self {
        self.data_root = root.as_ref().to_path_buf();
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_url_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.url_placeholder = placeholder.into();
        self
    }
    pub fn with_scrape_limit(mut self, n: usize) -> Self {
        self.scrape_limit = Some(n);
        self
    }

    // IO buffers tuning
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
