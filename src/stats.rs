//! Gold basic stats: streaming tokenization and frequency counting over the
//! silver `text_clean` column, plus the config hash used for provenance.

use crate::counting::TokenCounts;
use crate::date::truncate_to_micros;
use crate::error::{IoContext, PipelineError, Result};
use crate::models::{BasicStats, BasicStatsConfig};
use crate::progress::ProgressScope;
use crate::silver::{DEFAULT_BATCH_SIZE, PREPROCESS_VERSION};
use crate::stopwords::{get_stopwords, Stopwords};
use crate::util::open_with_backoff;
use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use time::{OffsetDateTime, UtcOffset};

const TEXT_COLUMN: &str = "text_clean";

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_']+").expect("static token pattern"))
}

/// Config-driven tokenizer. Stopwords are resolved at construction, so an
/// unsupported language fails before any text is read.
pub struct Tokenizer<'a> {
    config: &'a BasicStatsConfig,
    stopwords: Option<&'static Stopwords>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(config: &'a BasicStatsConfig) -> Result<Self> {
        let stopwords = if config.drop_stopwords { Some(get_stopwords(&config.stopwords_lang)?) } else { None };
        Ok(Self { config, stopwords })
    }

    /// Call `on_token` for every surviving token of `text`, in order.
    pub fn for_each_token(&self, text: &str, mut on_token: impl FnMut(&str)) {
        let lowered;
        let text = if self.config.lowercase {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        for m in token_re().find_iter(text) {
            let tok = m.as_str();
            if tok.len() < self.config.min_token_len {
                continue;
            }
            if self.config.drop_numeric_tokens && tok.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if self.stopwords.is_some_and(|sw| sw.contains(tok)) {
                continue;
            }
            on_token(tok);
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.for_each_token(text, |t| out.push(t.to_string()));
        out
    }
}

/// Canonical text of a config: keys sorted, no whitespace, `"key":value` pairs.
pub fn canonical_config(config: &BasicStatsConfig) -> String {
    let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
    fields.insert("top_n_tokens", Value::from(config.top_n_tokens));
    fields.insert("min_token_len", Value::from(config.min_token_len));
    fields.insert("drop_numeric_tokens", Value::from(config.drop_numeric_tokens));
    fields.insert("lowercase", Value::from(config.lowercase));
    fields.insert("drop_stopwords", Value::from(config.drop_stopwords));
    fields.insert("stopwords_lang", Value::from(config.stopwords_lang.as_str()));

    let body: Vec<String> = fields.iter().map(|(k, v)| format!("{}:{}", Value::from(*k), v)).collect();
    format!("{{{}}}", body.join(","))
}

/// First 16 hex chars of SHA-256 over [`canonical_config`].
pub fn config_hash(config: &BasicStatsConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_config(config).as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(16);
    hex
}

/// Computes [`BasicStats`] for one video from its silver file.
#[derive(Clone, Debug)]
pub struct BasicStatsService {
    preprocess_version: String,
    progress: bool,
}

impl Default for BasicStatsService {
    fn default() -> Self {
        Self { preprocess_version: PREPROCESS_VERSION.to_string(), progress: false }
    }
}

impl BasicStatsService {
    pub fn new(preprocess_version: impl Into<String>) -> Self {
        Self { preprocess_version: preprocess_version.into(), ..Self::default() }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Scan only `text_clean`, `batch_size` rows at a time. Null or blank texts
    /// count as empty; everything else is tokenized per `config`.
    pub fn compute_for_video(
        &self,
        video_id: &str,
        silver_path: &Path,
        config: &BasicStatsConfig,
        created_at_utc: OffsetDateTime,
        batch_size: usize,
    ) -> Result<BasicStats> {
        let tokenizer = Tokenizer::new(config)?;

        if !silver_path.exists() {
            return Err(PipelineError::NotFound { what: "silver dataset", path: silver_path.to_path_buf() });
        }
        let file = open_with_backoff(silver_path).io_context(|| format!("open {}", silver_path.display()))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let missing = || PipelineError::MissingColumn { path: silver_path.to_path_buf(), column: TEXT_COLUMN };
        let field = builder.schema().field_with_name(TEXT_COLUMN).map_err(|_| missing())?;
        if !matches!(field.data_type(), DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View) {
            return Err(missing());
        }

        let total_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
        let mask = ProjectionMask::columns(builder.parquet_schema(), [TEXT_COLUMN]);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size })
            .build()?;

        let pb = self.progress.then(|| ProgressScope::rows(format!("Stats {video_id}"), total_rows));
        let mut row_count: u64 = 0;
        let mut empty_text_count: u64 = 0;
        let mut counts = TokenCounts::new();

        for batch in reader {
            let batch = batch?;
            let column = cast(batch.column(0), &DataType::Utf8)?;
            let texts = column.as_any().downcast_ref::<StringArray>().ok_or_else(missing)?;
            row_count += batch.num_rows() as u64;

            for i in 0..texts.len() {
                if texts.is_null(i) || texts.value(i).trim().is_empty() {
                    empty_text_count += 1;
                    continue;
                }
                tokenizer.for_each_token(texts.value(i), |tok| counts.add(tok));
            }
            if let Some(pb) = &pb {
                pb.inc(batch.num_rows() as u64);
            }
        }
        if let Some(pb) = pb {
            pb.finish(format!("Stats {video_id} done"));
        }

        let stats = BasicStats {
            video_id: video_id.to_string(),
            silver_path: silver_path.display().to_string(),
            created_at_utc: truncate_to_micros(created_at_utc.to_offset(UtcOffset::UTC)),
            preprocess_version: self.preprocess_version.clone(),
            config_hash: config_hash(config),
            row_count,
            empty_text_count,
            total_token_count: counts.total(),
            unique_token_count: counts.unique(),
            top_tokens: counts.top_n(config.top_n_tokens),
        };
        tracing::info!(
            video_id,
            rows = stats.row_count,
            empty = stats.empty_text_count,
            tokens = stats.total_token_count,
            unique = stats.unique_token_count,
            config_hash = %stats.config_hash,
            "basic stats computed"
        );
        Ok(stats)
    }
}
