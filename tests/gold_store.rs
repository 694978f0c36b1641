#[path = "common/mod.rs"]
mod common;

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use common::*;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::sync::Arc;
use time::macros::datetime;
use yt_comments::{BasicStats, ErrorKind, GoldStore, ParquetGoldStore, PipelineError, TopToken};

fn sample_stats(video_id: &str) -> BasicStats {
    BasicStats {
        video_id: video_id.to_string(),
        silver_path: format!("data/silver/{video_id}/comments.parquet"),
        created_at_utc: datetime!(2026-01-02 03:04:05.678901 UTC),
        preprocess_version: "v1".to_string(),
        config_hash: "669af83d437d7e70".to_string(),
        row_count: 5,
        empty_text_count: 2,
        total_token_count: 5,
        unique_token_count: 2,
        top_tokens: vec![TopToken::new("world", 3), TopToken::new("hello", 2)],
    }
}

#[test]
fn save_then_load_round_trips_every_field() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path().join("gold"));
    let stats = sample_stats("vid_1");

    store.save(&stats).unwrap();
    let path = dir.path().join("gold").join("basic_stats").join("vid_1").join("stats.parquet");
    assert_eq!(store.path_for("vid_1"), path);
    assert!(path.exists());
    assert_eq!(store.load("vid_1").unwrap(), stats);
}

#[test]
fn empty_top_tokens_round_trip() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path());
    let mut stats = sample_stats("vid_1");
    stats.top_tokens.clear();
    stats.total_token_count = 0;
    stats.unique_token_count = 0;

    store.save(&stats).unwrap();
    assert_eq!(store.load("vid_1").unwrap(), stats);
}

#[test]
fn save_overwrites_previous_stats() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path());
    store.save(&sample_stats("vid_1")).unwrap();

    let mut newer = sample_stats("vid_1");
    newer.row_count = 9;
    newer.top_tokens = vec![TopToken::new("a", 1), TopToken::new("b", 1), TopToken::new("c", 1)];
    store.save(&newer).unwrap();
    assert_eq!(store.load("vid_1").unwrap(), newer);
}

#[test]
fn zoned_created_at_is_stored_as_utc() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path());
    let mut stats = sample_stats("vid_1");
    stats.created_at_utc = datetime!(2026-01-02 05:04:05 +02:00);

    store.save(&stats).unwrap();
    let back = store.load("vid_1").unwrap();
    assert_eq!(back, stats);
    assert!(back.created_at_utc.offset().is_utc());
    assert_eq!(back.created_at_utc.hour(), 3);
}

#[test]
fn sub_microsecond_created_at_is_refused() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path());
    let mut stats = sample_stats("vid_1");
    stats.created_at_utc = datetime!(2026-01-02 03:04:05.123456789 UTC);

    let err = store.save(&stats).unwrap_err();
    assert!(matches!(err, PipelineError::RowShape { row: 0, .. }));
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(!store.path_for("vid_1").exists());
    assert!(!store.path_for("vid_1").with_file_name("stats.parquet.tmp").exists());
}

#[test]
fn load_of_unknown_video_is_not_found() {
    let dir = scratch();
    let err = ParquetGoldStore::new(dir.path()).load("vid_1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn file_with_other_than_one_row_is_a_shape_error() {
    let dir = scratch();
    let store = ParquetGoldStore::new(dir.path());
    let path = store.path_for("vid_1");
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let schema = Arc::new(Schema::new(vec![Field::new("video_id", DataType::Utf8, false)]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(StringArray::from(vec!["vid_1", "vid_1"]))]).unwrap();
    let mut w = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    w.write(&batch).unwrap();
    w.close().unwrap();

    match store.load("vid_1").unwrap_err() {
        PipelineError::GoldShape { rows, .. } => assert_eq!(rows, 2),
        other => panic!("expected GoldShape, got {other:?}"),
    }
}
