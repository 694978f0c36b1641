#![allow(dead_code)]

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use time::macros::datetime;
use yt_comments::{BasicStatsConfig, Comment};

pub fn scratch() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Write a parquet file holding only a nullable `text_clean` column,
/// the minimum the stats engine needs.
pub fn write_text_clean_parquet(path: &Path, texts: &[Option<&str>]) {
    write_utf8_column_parquet(path, "text_clean", texts);
}

pub fn write_utf8_column_parquet(path: &Path, column: &str, texts: &[Option<&str>]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let schema = Arc::new(Schema::new(vec![Field::new(column, DataType::Utf8, true)]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(StringArray::from(texts.to_vec()))]).unwrap();
    let mut w = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    w.write(&batch).unwrap();
    w.close().unwrap();
}

/// Three comments for `video_id`:
/// - c1 zoned at +02:00 with a URL and odd spacing
/// - c2 naive, no author
/// - r1 a reply with no timestamp and no like count
pub fn sample_comments(video_id: &str) -> Vec<Comment> {
    vec![
        Comment::new(video_id, "c1", "Check  THIS https://example.com/x?y=1 out")
            .with_author("alice")
            .with_like_count(5)
            .with_published_at(datetime!(2026-01-01 12:00:00 +02:00)),
        Comment::new(video_id, "c2", "Hello   WORLD!")
            .with_like_count(0)
            .with_published_at(datetime!(2026-01-01 10:00:00)),
        Comment::new(video_id, "r1", "great video, great song").reply(true),
    ]
}

/// Stats config with stopwords off and everything else at its defaults.
pub fn config_keep_stopwords(top_n: usize) -> BasicStatsConfig {
    BasicStatsConfig::default().with_top_n_tokens(top_n).with_drop_stopwords(false)
}
