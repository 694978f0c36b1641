//! Gold layer: one single-row Parquet file of [`BasicStats`] per video.

use crate::date::{from_unix_micros, to_unix_micros};
use crate::error::{IoContext, PipelineError, Result};
use crate::models::{BasicStats, TopToken};
use crate::paths::{basic_stats_file, tmp_sibling};
use crate::util::{create_with_backoff, ensure_parent, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use arrow::array::{Array, ArrayRef, Int64Array, ListArray, StringArray, StructArray, TimestampMicrosecondArray};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, FieldRef, Fields, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcOffset;

/// Storage contract for per-video basic stats.
pub trait GoldStore {
    fn save(&self, stats: &BasicStats) -> Result<()>;
    fn load(&self, video_id: &str) -> Result<BasicStats>;
}

fn top_token_fields() -> Fields {
    Fields::from(vec![
        Field::new("token", DataType::Utf8, false),
        Field::new("count", DataType::Int64, false),
    ])
}

fn top_token_item() -> FieldRef {
    Arc::new(Field::new("item", DataType::Struct(top_token_fields()), true))
}

pub fn basic_stats_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("video_id", DataType::Utf8, false),
        Field::new("silver_path", DataType::Utf8, false),
        Field::new("created_at_utc", DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())), false),
        Field::new("preprocess_version", DataType::Utf8, false),
        Field::new("config_hash", DataType::Utf8, false),
        Field::new("row_count", DataType::Int64, false),
        Field::new("empty_text_count", DataType::Int64, false),
        Field::new("total_token_count", DataType::Int64, false),
        Field::new("unique_token_count", DataType::Int64, false),
        Field::new("top_tokens", DataType::List(top_token_item()), false),
    ]))
}

fn to_i64(field: &'static str, v: u64) -> Result<i64> {
    i64::try_from(v).map_err(|_| PipelineError::RowShape { row: 0, reason: format!("{field}={v} exceeds Int64") })
}

fn to_u64(field: &'static str, v: i64) -> Result<u64> {
    u64::try_from(v).map_err(|_| PipelineError::RowShape { row: 0, reason: format!("{field}={v} is negative") })
}

/// The file stores microseconds, so finer timestamps would not load back equal.
fn created_at_micros(stats: &BasicStats) -> Result<i64> {
    let at = stats.created_at_utc.to_offset(UtcOffset::UTC);
    if at.nanosecond() % 1_000 != 0 {
        return Err(PipelineError::RowShape {
            row: 0,
            reason: format!("created_at_utc {at} has sub-microsecond precision"),
        });
    }
    Ok(to_unix_micros(at))
}

fn stats_to_batch(stats: &BasicStats) -> Result<RecordBatch> {
    let created_at = created_at_micros(stats)?;
    let tokens = StringArray::from(stats.top_tokens.iter().map(|t| t.token.as_str()).collect::<Vec<_>>());
    let counts = stats
        .top_tokens
        .iter()
        .map(|t| to_i64("top_tokens.count", t.count))
        .collect::<Result<Vec<_>>>()?;
    let entries = StructArray::try_new(
        top_token_fields(),
        vec![Arc::new(tokens) as ArrayRef, Arc::new(Int64Array::from(counts))],
        None,
    )?;
    let top_tokens = ListArray::try_new(
        top_token_item(),
        OffsetBuffer::from_lengths([entries.len()]),
        Arc::new(entries),
        None,
    )?;

    let int = |name: &'static str, v: u64| -> Result<ArrayRef> { Ok(Arc::new(Int64Array::from(vec![to_i64(name, v)?]))) };
    let string = |v: &str| -> ArrayRef { Arc::new(StringArray::from(vec![v])) };

    let arrays: Vec<ArrayRef> = vec![
        string(stats.video_id.as_str()),
        string(stats.silver_path.as_str()),
        Arc::new(TimestampMicrosecondArray::from(vec![created_at]).with_timezone("UTC")),
        string(stats.preprocess_version.as_str()),
        string(stats.config_hash.as_str()),
        int("row_count", stats.row_count)?,
        int("empty_text_count", stats.empty_text_count)?,
        int("total_token_count", stats.total_token_count)?,
        int("unique_token_count", stats.unique_token_count)?,
        Arc::new(top_tokens),
    ];
    Ok(RecordBatch::try_new(basic_stats_schema(), arrays)?)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, path: &Path, name: &'static str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| PipelineError::MissingColumn { path: path.to_path_buf(), column: name })
}

fn batch_to_stats(batch: &RecordBatch, path: &Path) -> Result<BasicStats> {
    let missing = |column| PipelineError::MissingColumn { path: path.to_path_buf(), column };
    let text = |name: &'static str| -> Result<String> { Ok(column::<StringArray>(batch, path, name)?.value(0).to_string()) };
    let count = |name: &'static str| -> Result<u64> { to_u64(name, column::<Int64Array>(batch, path, name)?.value(0)) };

    let created_at = column::<TimestampMicrosecondArray>(batch, path, "created_at_utc")?.value(0);
    let list = column::<ListArray>(batch, path, "top_tokens")?;
    let entries = list.value(0);
    let entries = entries.as_any().downcast_ref::<StructArray>().ok_or_else(|| missing("top_tokens"))?;
    let tokens = entries
        .column_by_name("token")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| missing("top_tokens.token"))?;
    let counts = entries
        .column_by_name("count")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| missing("top_tokens.count"))?;

    let top_tokens = (0..entries.len())
        .map(|i| Ok(TopToken::new(tokens.value(i), to_u64("top_tokens.count", counts.value(i))?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(BasicStats {
        video_id: text("video_id")?,
        silver_path: text("silver_path")?,
        created_at_utc: from_unix_micros(created_at)?,
        preprocess_version: text("preprocess_version")?,
        config_hash: text("config_hash")?,
        row_count: count("row_count")?,
        empty_text_count: count("empty_text_count")?,
        total_token_count: count("total_token_count")?,
        unique_token_count: count("unique_token_count")?,
        top_tokens,
    })
}

/// Parquet-backed [`GoldStore`]: `<dir>/basic_stats/<video_id>/stats.parquet`.
#[derive(Clone, Debug)]
pub struct ParquetGoldStore {
    dir: PathBuf,
}

impl ParquetGoldStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, video_id: &str) -> PathBuf {
        basic_stats_file(&self.dir, video_id)
    }
}

impl GoldStore for ParquetGoldStore {
    /// Overwrites any previous stats for the video. `created_at_utc` is
    /// stored in UTC whatever its offset.
    fn save(&self, stats: &BasicStats) -> Result<()> {
        let batch = stats_to_batch(stats)?;

        let path = self.path_for(&stats.video_id);
        ensure_parent(&path)?;
        let tmp = tmp_sibling(&path);
        let file = create_with_backoff(&tmp).io_context(|| format!("create {}", tmp.display()))?;
        let written = ArrowWriter::try_new(file, batch.schema(), None).and_then(|mut w| {
            w.write(&batch)?;
            w.close()
        });
        if let Err(e) = written {
            let _ = remove_with_backoff(&tmp);
            return Err(e.into());
        }
        replace_file_atomic_backoff(&tmp, &path)?;
        tracing::info!(video_id = %stats.video_id, "gold basic stats saved to {}", path.display());
        Ok(())
    }

    fn load(&self, video_id: &str) -> Result<BasicStats> {
        let path = self.path_for(video_id);
        if !path.exists() {
            return Err(PipelineError::NotFound { what: "gold basic stats", path });
        }
        let file = open_with_backoff(&path).io_context(|| format!("open {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut rows = 0usize;
        let mut found = None;
        for batch in reader {
            let batch = batch?;
            rows += batch.num_rows();
            if batch.num_rows() > 0 && found.is_none() {
                found = Some(batch);
            }
        }
        match found {
            Some(batch) if rows == 1 => batch_to_stats(&batch, &path),
            _ => Err(PipelineError::GoldShape { path, rows }),
        }
    }
}
