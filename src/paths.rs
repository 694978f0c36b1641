//! On-disk layout of the three stages under a data root:
//!
//! ```text
//! <root>/bronze/<video_id>.jsonl
//! <root>/silver/<video_id>/comments.parquet
//! <root>/gold/basic_stats/<video_id>/stats.parquet
//! ```
//!
//! Each store is rooted at its own directory, so the per-store helpers take that
//! directory rather than the data root.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const BRONZE_DIR: &str = "bronze";
pub const SILVER_DIR: &str = "silver";
pub const GOLD_DIR: &str = "gold";

pub fn bronze_dir(data_root: &Path) -> PathBuf {
    data_root.join(BRONZE_DIR)
}

pub fn silver_dir(data_root: &Path) -> PathBuf {
    data_root.join(SILVER_DIR)
}

pub fn gold_dir(data_root: &Path) -> PathBuf {
    data_root.join(GOLD_DIR)
}

pub fn bronze_file(bronze_dir: &Path, video_id: &str) -> PathBuf {
    bronze_dir.join(format!("{video_id}.jsonl"))
}

pub fn silver_file(silver_dir: &Path, video_id: &str) -> PathBuf {
    silver_dir.join(video_id).join("comments.parquet")
}

pub fn basic_stats_file(gold_dir: &Path, video_id: &str) -> PathBuf {
    gold_dir.join("basic_stats").join(video_id).join("stats.parquet")
}

/// Sibling temp path used while a file is being written (`<name>.tmp`).
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("part"));
    name.push(".tmp");
    path.with_file_name(name)
}
