#[path = "common/mod.rs"]
mod common;

use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use common::*;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use time::macros::datetime;
use time::OffsetDateTime;
use yt_comments::{
    silver_schema, to_silver_row, BronzeStore, Comment, ErrorKind, JsonlBronzeStore, ParquetSilverStore,
    PipelineError, PreprocessService, SilverBatchWriter, SilverStore, SilverTransform, TextPreprocessor,
    PREPROCESS_VERSION,
};

const PROCESSED_AT: OffsetDateTime = datetime!(2026-02-01 08:30:00.123456 UTC);

#[test]
fn transform_cleans_text_and_defaults_missing_fields() {
    let comment = Comment::new("vid_1", "c1", "Hello   WORLD! https://example.com")
        .with_author("bob")
        .with_published_at(datetime!(2026-01-01 10:00:00));
    let row = to_silver_row(comment, PROCESSED_AT);

    assert_eq!(row.text_clean, "hello world! <url>");
    assert_eq!(row.text_raw, "Hello   WORLD! https://example.com");
    assert_eq!(row.author, "bob");
    assert_eq!(row.like_count, 0);
    assert_eq!(row.published_at, datetime!(2026-01-01 10:00:00 UTC));
    assert!(row.published_at.offset().is_utc());
    assert_eq!(row.preprocess_version, PREPROCESS_VERSION);
    assert_eq!(row.processed_at, PROCESSED_AT);
}

#[test]
fn transform_timestamp_policy() {
    let zoned = Comment::new("v", "z", "x").with_published_at(datetime!(2026-01-01 12:00:00 +02:00));
    let naive = Comment::new("v", "n", "x").with_published_at(datetime!(2026-01-01 12:00:00));
    let absent = Comment::new("v", "a", "x");

    let zoned = to_silver_row(zoned, PROCESSED_AT);
    assert_eq!(zoned.published_at, datetime!(2026-01-01 10:00:00 UTC));
    assert!(zoned.published_at.offset().is_utc());

    assert_eq!(to_silver_row(naive, PROCESSED_AT).published_at, datetime!(2026-01-01 12:00:00 UTC));
    assert_eq!(to_silver_row(absent, PROCESSED_AT).published_at, OffsetDateTime::UNIX_EPOCH);

    let shifted = to_silver_row(Comment::new("v", "p", "x"), datetime!(2026-02-01 10:30:00 +02:00));
    assert_eq!(shifted.processed_at, datetime!(2026-02-01 08:30:00 UTC));
    assert!(shifted.processed_at.offset().is_utc());
}

#[test]
fn cleaning_normalizes_unicode_urls_and_whitespace() {
    let tp = TextPreprocessor::default();
    assert_eq!(tp.clean("ＦＵＬＬ　ｗｉｄｔｈ"), "full width");
    assert_eq!(tp.clean("ﬁne"), "fine");
    assert_eq!(tp.clean("see WWW.Example.com/page now"), "see <url> now");
    assert_eq!(tp.clean("HTTP://A.B/c\tand\nhttps://x.y"), "<url> and <url>");
    assert_eq!(tp.clean("  \t\n "), "");
    assert_eq!(tp.clean(""), "");

    let custom = SilverTransform::new(TextPreprocessor::new("[LINK]"));
    let row = custom.to_silver_row(Comment::new("v", "c", "go to https://a.b"), PROCESSED_AT);
    assert_eq!(row.text_clean, "go to [link]");
}

#[test]
fn store_round_trips_rows_and_keeps_column_order() {
    let dir = scratch();
    let store = ParquetSilverStore::new(dir.path());
    let rows: Vec<_> = sample_comments("vid_1").into_iter().map(|c| to_silver_row(c, PROCESSED_AT)).collect();

    let path = store.save("vid_1", rows.clone(), 5000, true).unwrap();
    assert_eq!(path, dir.path().join("vid_1").join("comments.parquet"));
    assert!(!path.with_file_name("comments.parquet.tmp").exists());
    assert_eq!(store.load("vid_1").unwrap(), rows);

    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
    let names: Vec<String> = builder.schema().fields().iter().map(|f| f.name().clone()).collect();
    let expected: Vec<String> = silver_schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, expected);
    assert_eq!(names[0], "video_id");
    assert_eq!(names[9], "processed_at");
}

#[test]
fn rows_are_flushed_in_batches_of_batch_size() {
    let dir = scratch();
    let store = ParquetSilverStore::new(dir.path());
    let rows: Vec<_> = (0..5)
        .map(|i| to_silver_row(Comment::new("vid_1", format!("c{i}"), format!("text {i}")), PROCESSED_AT))
        .collect();

    let path = store.save("vid_1", rows.clone(), 2, true).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
    let groups: Vec<i64> = builder.metadata().row_groups().iter().map(|g| g.num_rows()).collect();
    assert_eq!(groups, vec![2, 2, 1]);
    assert_eq!(store.load("vid_1").unwrap(), rows);
}

#[test]
fn refusing_to_overwrite_leaves_the_file_untouched() {
    let dir = scratch();
    let store = ParquetSilverStore::new(dir.path());
    let rows: Vec<_> = sample_comments("vid_1").into_iter().map(|c| to_silver_row(c, PROCESSED_AT)).collect();
    let path = store.save("vid_1", rows.clone(), 5000, true).unwrap();
    let before = fs::read(&path).unwrap();

    let err = store.save("vid_1", rows[..1].to_vec(), 5000, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert!(matches!(err, PipelineError::OverwriteRefused { .. }));
    assert_eq!(fs::read(&path).unwrap(), before);

    store.save("vid_1", rows[..1].to_vec(), 5000, true).unwrap();
    assert_eq!(store.load("vid_1").unwrap().len(), 1);
}

#[test]
fn load_without_save_is_not_found() {
    let dir = scratch();
    let err = ParquetSilverStore::new(dir.path()).load("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Silver-shaped file with nullable columns, so bad values can be planted.
fn write_loose_silver(path: &Path, authors: Vec<Option<&str>>, likes: Vec<Option<i64>>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let n = authors.len();
    let utc_us = DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()));
    let names = [
        ("video_id", DataType::Utf8),
        ("comment_id", DataType::Utf8),
        ("author", DataType::Utf8),
        ("published_at", utc_us.clone()),
        ("like_count", DataType::Int64),
        ("is_reply", DataType::Boolean),
        ("text_raw", DataType::Utf8),
        ("text_clean", DataType::Utf8),
        ("preprocess_version", DataType::Utf8),
        ("processed_at", utc_us),
    ];
    let schema = Arc::new(Schema::new(
        names.iter().map(|(name, ty)| Field::new(*name, ty.clone(), true)).collect::<Vec<_>>(),
    ));
    let text = |v: &str| -> ArrayRef { Arc::new(StringArray::from(vec![v; n])) };
    let ts = || -> ArrayRef { Arc::new(TimestampMicrosecondArray::from(vec![0i64; n]).with_timezone("UTC")) };
    let columns: Vec<ArrayRef> = vec![
        text("vid_1"),
        text("c1"),
        Arc::new(StringArray::from(authors)),
        ts(),
        Arc::new(Int64Array::from(likes)),
        Arc::new(BooleanArray::from(vec![false; n])),
        text("hi"),
        text("hi"),
        text(PREPROCESS_VERSION),
        ts(),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mut w = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    w.write(&batch).unwrap();
    w.close().unwrap();
}

#[test]
fn negative_like_count_on_load_is_a_row_shape_error() {
    let dir = scratch();
    let store = ParquetSilverStore::new(dir.path());
    write_loose_silver(&store.path_for("vid_1"), vec![Some("a"), Some("b")], vec![Some(1), Some(-3)]);

    let err = store.load("vid_1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    match err {
        PipelineError::RowShape { row, reason } => {
            assert_eq!(row, 1);
            assert!(reason.contains("like_count"), "{reason}");
        }
        other => panic!("expected RowShape, got {other:?}"),
    }
}

#[test]
fn null_in_a_required_column_on_load_is_a_row_shape_error() {
    let dir = scratch();
    let store = ParquetSilverStore::new(dir.path());

    write_loose_silver(&store.path_for("vid_1"), vec![Some("a"), None], vec![Some(1), Some(2)]);
    match store.load("vid_1").unwrap_err() {
        PipelineError::RowShape { row, reason } => {
            assert_eq!(row, 1);
            assert!(reason.contains("author"), "{reason}");
        }
        other => panic!("expected RowShape, got {other:?}"),
    }

    write_loose_silver(&store.path_for("vid_2"), vec![Some("a")], vec![None]);
    assert!(matches!(store.load("vid_2").unwrap_err(), PipelineError::RowShape { row: 0, .. }));
}

#[test]
fn non_utc_rows_are_rejected_and_nothing_is_published() {
    let dir = scratch();
    let dest = dir.path().join("vid_1").join("comments.parquet");
    let mut row = to_silver_row(Comment::new("vid_1", "c1", "x"), PROCESSED_AT);
    row.published_at = datetime!(2026-01-01 12:00:00 +02:00);

    {
        let mut writer = SilverBatchWriter::create(&dest, 10).unwrap();
        let err = writer.push(row).unwrap_err();
        assert!(matches!(err, PipelineError::RowShape { row: 0, .. }));
    }
    assert!(!dest.exists());
    assert!(!dest.with_file_name("comments.parquet.tmp").exists());
}

#[test]
fn preprocess_service_stamps_one_processed_at_per_run() {
    let dir = scratch();
    let bronze = JsonlBronzeStore::new(dir.path().join("bronze"));
    let silver = ParquetSilverStore::new(dir.path().join("silver"));
    bronze.save("vid_1", sample_comments("vid_1"), true).unwrap();

    let service = PreprocessService::new(bronze, silver.clone(), TextPreprocessor::default());
    let path = service.run_at("vid_1", true, 2, PROCESSED_AT).unwrap();
    assert_eq!(path, dir.path().join("silver").join("vid_1").join("comments.parquet"));

    let rows = silver.load("vid_1").unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.processed_at == PROCESSED_AT));
    assert_eq!(rows[0].text_clean, "check this <url> out");
    assert_eq!(rows[0].published_at, datetime!(2026-01-01 10:00:00 UTC));
    assert_eq!(rows[1].author, "");
    assert_eq!(rows[2].published_at, OffsetDateTime::UNIX_EPOCH);
    assert!(rows[2].is_reply);

    let err = service.run("vid_1", false, 2).unwrap_err();
    assert!(matches!(err, PipelineError::OverwriteRefused { .. }));
}

#[test]
fn empty_bronze_produces_an_empty_silver_file() {
    let dir = scratch();
    let bronze = JsonlBronzeStore::new(dir.path().join("bronze"));
    let silver = ParquetSilverStore::new(dir.path().join("silver"));

    let path = PreprocessService::new(bronze, silver.clone(), TextPreprocessor::default())
        .run("nothing", true, 100)
        .unwrap();
    assert!(path.exists());
    assert!(silver.load("nothing").unwrap().is_empty());
}
