mod config;
mod date;
mod error;
mod models;
mod paths;

mod progress;
mod concurrency;
mod counting;
mod util;
mod pipeline;

mod ndjson;
mod bronze;
mod text;
mod silver;
mod stopwords;
mod stats;
mod gold;
mod source;
mod video_id;

pub use crate::config::{PipelineOptions, ENV_BATCH_SIZE, ENV_DATA_ROOT};
pub use crate::date::{now_utc, truncate_to_micros, PublishedAt};
pub use crate::error::{ErrorKind, PipelineError, Result, SourceError};
pub use crate::models::{BasicStats, BasicStatsConfig, Comment, SilverRow, TopToken};
pub use crate::pipeline::{CommentsPipeline, VideoReport};

// stage contracts and their file-backed implementations
pub use crate::bronze::{BronzeStore, JsonlBronzeStore};
pub use crate::silver::{
    silver_schema, to_silver_row, ParquetSilverStore, PreprocessService, SilverBatchWriter, SilverStore,
    SilverTransform, DEFAULT_BATCH_SIZE, PREPROCESS_VERSION,
};
pub use crate::gold::{basic_stats_schema, GoldStore, ParquetGoldStore};
pub use crate::source::{CommentSource, ScrapeResult, ScrapeService, StubSource};

// text and stats building blocks
pub use crate::text::{TextPreprocessor, DEFAULT_URL_PLACEHOLDER};
pub use crate::stats::{canonical_config, config_hash, BasicStatsService, Tokenizer};
pub use crate::stopwords::{get_stopwords, Stopwords, SUPPORTED_LANGS};
pub use crate::counting::TokenCounts;
pub use crate::video_id::extract_video_id;

// path-naming contract
pub use crate::paths::{basic_stats_file, bronze_dir, bronze_file, gold_dir, silver_dir, silver_file};

// Expose multiprogress so the binary can render parallel videos together.
pub use crate::progress::{set_global_multiprogress, ProgressScope};

//export robust file ops and tracing init from util so binaries can import from crate root.
pub use crate::util::{init_tracing_once, open_with_backoff, create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};

// export NDJSON helpers
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};
