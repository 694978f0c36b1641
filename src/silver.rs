//! Silver layer: the pure bronze → silver row transform and the Parquet store
//! that writes rows in bounded-memory batches.

use crate::bronze::BronzeStore;
use crate::date::{epoch_utc, from_unix_micros, to_unix_micros, truncate_to_micros};
use crate::error::{IoContext, PipelineError, Result};
use crate::models::{Comment, SilverRow};
use crate::paths::{silver_file, tmp_sibling};
use crate::progress::ProgressScope;
use crate::text::TextPreprocessor;
use crate::util::{create_with_backoff, ensure_parent, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use time::{OffsetDateTime, UtcOffset};

pub const PREPROCESS_VERSION: &str = "v1";
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Fixed silver schema. Column order is part of the file contract.
pub fn silver_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            let utc_us = DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()));
            Arc::new(Schema::new(vec![
                Field::new("video_id", DataType::Utf8, false),
                Field::new("comment_id", DataType::Utf8, false),
                Field::new("author", DataType::Utf8, false),
                Field::new("published_at", utc_us.clone(), false),
                Field::new("like_count", DataType::Int64, false),
                Field::new("is_reply", DataType::Boolean, false),
                Field::new("text_raw", DataType::Utf8, false),
                Field::new("text_clean", DataType::Utf8, false),
                Field::new("preprocess_version", DataType::Utf8, false),
                Field::new("processed_at", utc_us, false),
            ]))
        })
        .clone()
}

// ----------------------------- Transform ----------------------------------

/// Bronze → silver mapping. Total over [`Comment`]: never fails.
#[derive(Clone, Debug, Default)]
pub struct SilverTransform {
    tp: TextPreprocessor,
}

impl SilverTransform {
    pub fn new(tp: TextPreprocessor) -> Self {
        Self { tp }
    }

    pub fn to_silver_row(&self, comment: Comment, processed_at: OffsetDateTime) -> SilverRow {
        let published_at = comment.published_at.map(|p| p.to_utc()).unwrap_or_else(epoch_utc);
        let text_clean = self.tp.clean(&comment.text);
        SilverRow {
            video_id: comment.video_id,
            comment_id: comment.comment_id,
            author: comment.author.unwrap_or_default(),
            published_at: truncate_to_micros(published_at),
            like_count: comment.like_count.unwrap_or(0),
            is_reply: comment.is_reply,
            text_raw: comment.text,
            text_clean,
            preprocess_version: PREPROCESS_VERSION.to_string(),
            processed_at: truncate_to_micros(processed_at.to_offset(UtcOffset::UTC)),
        }
    }
}

/// [`SilverTransform::to_silver_row`] with the default text preprocessor.
pub fn to_silver_row(comment: Comment, processed_at: OffsetDateTime) -> SilverRow {
    SilverTransform::default().to_silver_row(comment, processed_at)
}

// ----------------------------- Batch writer -------------------------------

fn check_row(row: &SilverRow, index: u64) -> Result<()> {
    let shape_err = |reason: String| PipelineError::RowShape { row: index, reason };
    if !row.published_at.offset().is_utc() {
        return Err(shape_err(format!("published_at has offset {}", row.published_at.offset())));
    }
    if !row.processed_at.offset().is_utc() {
        return Err(shape_err(format!("processed_at has offset {}", row.processed_at.offset())));
    }
    if i64::try_from(row.like_count).is_err() {
        return Err(shape_err(format!("like_count {} exceeds Int64", row.like_count)));
    }
    Ok(())
}

fn rows_to_batch(schema: &SchemaRef, rows: &[SilverRow]) -> Result<RecordBatch> {
    let strings = |f: fn(&SilverRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let timestamps = |f: fn(&SilverRow) -> OffsetDateTime| -> ArrayRef {
        let micros: Vec<i64> = rows.iter().map(|r| to_unix_micros(f(r))).collect();
        Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
    };
    let like_counts: Vec<i64> = rows.iter().map(|r| r.like_count as i64).collect();
    let is_reply: Vec<bool> = rows.iter().map(|r| r.is_reply).collect();

    let arrays: Vec<ArrayRef> = vec![
        strings(|r| r.video_id.as_str()),
        strings(|r| r.comment_id.as_str()),
        strings(|r| r.author.as_str()),
        timestamps(|r| r.published_at),
        Arc::new(Int64Array::from(like_counts)),
        Arc::new(BooleanArray::from(is_reply)),
        strings(|r| r.text_raw.as_str()),
        strings(|r| r.text_clean.as_str()),
        strings(|r| r.preprocess_version.as_str()),
        timestamps(|r| r.processed_at),
    ];
    Ok(RecordBatch::try_new(schema.clone(), arrays)?)
}

/// Buffers up to `batch_size` rows and writes each full buffer as one Parquet
/// row group into a temp sibling of the destination.
///
/// `finish` flushes the remainder and promotes the temp file. Dropping an
/// unfinished writer (error paths included) deletes the temp file, so the
/// destination never holds a partial result.
pub struct SilverBatchWriter {
    schema: SchemaRef,
    tmp: PathBuf,
    dest: PathBuf,
    writer: Option<ArrowWriter<File>>,
    buf: Vec<SilverRow>,
    batch_size: usize,
    rows_written: u64,
    batches_written: u64,
}

impl SilverBatchWriter {
    pub fn create(dest: &Path, batch_size: usize) -> Result<Self> {
        let batch_size = batch_size.max(1);
        ensure_parent(dest)?;
        let tmp = tmp_sibling(dest);
        let file = create_with_backoff(&tmp).io_context(|| format!("create {}", tmp.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_max_row_group_size(batch_size)
            .build();
        let schema = silver_schema();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        Ok(Self {
            schema,
            tmp,
            dest: dest.to_path_buf(),
            writer: Some(writer),
            buf: Vec::with_capacity(batch_size),
            batch_size,
            rows_written: 0,
            batches_written: 0,
        })
    }

    pub fn push(&mut self, row: SilverRow) -> Result<()> {
        check_row(&row, self.rows_written + self.buf.len() as u64)?;
        self.buf.push(row);
        if self.buf.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write buffered rows as one batch. No-op when the buffer is empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let batch = rows_to_batch(&self.schema, &self.buf)?;
        if let Some(w) = self.writer.as_mut() {
            w.write(&batch)?;
            w.flush()?;
        }
        self.rows_written += self.buf.len() as u64;
        self.batches_written += 1;
        tracing::debug!(rows = self.buf.len(), batch = self.batches_written, "silver batch flushed");
        self.buf.clear();
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.flush()?;
        if let Some(w) = self.writer.take() {
            w.close()?;
        }
        replace_file_atomic_backoff(&self.tmp, &self.dest)?;
        Ok(self.dest.clone())
    }
}

impl Drop for SilverBatchWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = remove_with_backoff(&self.tmp);
        }
    }
}

// ----------------------------- Store --------------------------------------

/// Storage contract for normalized rows.
pub trait SilverStore {
    fn path_for(&self, video_id: &str) -> PathBuf;

    /// Stream `rows` to the artifact for `video_id` in batches of `batch_size`.
    /// Refuses when the artifact exists and `overwrite` is false.
    fn save<I>(&self, video_id: &str, rows: I, batch_size: usize, overwrite: bool) -> Result<PathBuf>
    where
        I: IntoIterator<Item = SilverRow>;

    fn load(&self, video_id: &str) -> Result<Vec<SilverRow>>;
}

/// Parquet-backed [`SilverStore`]: `<dir>/<video_id>/comments.parquet`.
#[derive(Clone, Debug)]
pub struct ParquetSilverStore {
    dir: PathBuf,
}

impl ParquetSilverStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

impl SilverStore for ParquetSilverStore {
    fn path_for(&self, video_id: &str) -> PathBuf {
        silver_file(&self.dir, video_id)
    }

    fn save<I>(&self, video_id: &str, rows: I, batch_size: usize, overwrite: bool) -> Result<PathBuf>
    where
        I: IntoIterator<Item = SilverRow>,
    {
        let path = self.path_for(video_id);
        if path.exists() {
            if !overwrite {
                return Err(PipelineError::OverwriteRefused { path });
            }
            remove_with_backoff(&path)?;
        }

        let mut writer = SilverBatchWriter::create(&path, batch_size)?;
        let mut rows_written: u64 = 0;
        for row in rows {
            writer.push(row)?;
            rows_written += 1;
        }
        let path = writer.finish()?;
        tracing::info!(video_id, rows = rows_written, "silver saved to {}", path.display());
        Ok(path)
    }

    fn load(&self, video_id: &str) -> Result<Vec<SilverRow>> {
        let path = self.path_for(video_id);
        if !path.exists() {
            return Err(PipelineError::NotFound { what: "silver dataset", path });
        }
        let file = open_with_backoff(&path).io_context(|| format!("open {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(DEFAULT_BATCH_SIZE)
            .build()?;

        let mut rows = Vec::new();
        for batch in reader {
            append_rows(&batch?, &path, &mut rows)?;
        }
        Ok(rows)
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, path: &Path, name: &'static str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| PipelineError::MissingColumn { path: path.to_path_buf(), column: name })
}

fn append_rows(batch: &RecordBatch, path: &Path, out: &mut Vec<SilverRow>) -> Result<()> {
    let video_id = column::<StringArray>(batch, path, "video_id")?;
    let comment_id = column::<StringArray>(batch, path, "comment_id")?;
    let author = column::<StringArray>(batch, path, "author")?;
    let published_at = column::<TimestampMicrosecondArray>(batch, path, "published_at")?;
    let like_count = column::<Int64Array>(batch, path, "like_count")?;
    let is_reply = column::<BooleanArray>(batch, path, "is_reply")?;
    let text_raw = column::<StringArray>(batch, path, "text_raw")?;
    let text_clean = column::<StringArray>(batch, path, "text_clean")?;
    let preprocess_version = column::<StringArray>(batch, path, "preprocess_version")?;
    let processed_at = column::<TimestampMicrosecondArray>(batch, path, "processed_at")?;

    let required: [(&str, &dyn Array); 10] = [
        ("video_id", video_id),
        ("comment_id", comment_id),
        ("author", author),
        ("published_at", published_at),
        ("like_count", like_count),
        ("is_reply", is_reply),
        ("text_raw", text_raw),
        ("text_clean", text_clean),
        ("preprocess_version", preprocess_version),
        ("processed_at", processed_at),
    ];

    out.reserve(batch.num_rows());
    for i in 0..batch.num_rows() {
        let row = out.len() as u64;
        if let Some((name, _)) = required.iter().find(|(_, col)| col.is_null(i)) {
            return Err(PipelineError::RowShape { row, reason: format!("{name} is null") });
        }
        let likes = like_count.value(i);
        let likes = u64::try_from(likes)
            .map_err(|_| PipelineError::RowShape { row, reason: format!("like_count {likes} is negative") })?;
        out.push(SilverRow {
            video_id: video_id.value(i).to_string(),
            comment_id: comment_id.value(i).to_string(),
            author: author.value(i).to_string(),
            published_at: from_unix_micros(published_at.value(i))?,
            like_count: likes,
            is_reply: is_reply.value(i),
            text_raw: text_raw.value(i).to_string(),
            text_clean: text_clean.value(i).to_string(),
            preprocess_version: preprocess_version.value(i).to_string(),
            processed_at: from_unix_micros(processed_at.value(i))?,
        });
    }
    Ok(())
}

// ----------------------------- Stage --------------------------------------

/// Bronze → silver stage for one video.
pub struct PreprocessService<B, S> {
    bronze: B,
    silver: S,
    transform: SilverTransform,
    progress: bool,
}

impl<B: BronzeStore, S: SilverStore> PreprocessService<B, S> {
    pub fn new(bronze: B, silver: S, tp: TextPreprocessor) -> Self {
        Self { bronze, silver, transform: SilverTransform::new(tp), progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Every row of one run shares a single `processed_at`.
    pub fn run(&self, video_id: &str, overwrite: bool, batch_size: usize) -> Result<PathBuf> {
        self.run_at(video_id, overwrite, batch_size, crate::date::now_utc())
    }

    pub fn run_at(
        &self,
        video_id: &str,
        overwrite: bool,
        batch_size: usize,
        processed_at: OffsetDateTime,
    ) -> Result<PathBuf> {
        let comments = self.bronze.load(video_id)?;
        if comments.is_empty() {
            tracing::warn!(video_id, "bronze is empty; writing an empty silver dataset");
        }
        let pb = self.progress.then(|| ProgressScope::rows("Preprocess", comments.len() as u64));
        let rows = comments.into_iter().map(|c| {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            self.transform.to_silver_row(c, processed_at)
        });
        let out = self.silver.save(video_id, rows, batch_size, overwrite)?;
        if let Some(pb) = pb {
            pb.finish("Preprocess done");
        }
        Ok(out)
    }
}
