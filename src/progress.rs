//! Progress reporting for the row-oriented stages.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Optional global MultiProgress so bars from parallel videos render together.
static GLOBAL_MP: OnceLock<Arc<MultiProgress>> = OnceLock::new();

/// Install a global MultiProgress used by all subsequently created bars.
/// Safe to call once; additional calls are ignored.
pub fn set_global_multiprogress(mp: Arc<MultiProgress>) {
    let _ = GLOBAL_MP.set(mp);
}

fn new_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    match GLOBAL_MP.get() {
        Some(mp) => mp.add(pb),
        None => pb,
    }
}

fn count_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  rows/s: {per_sec}  elapsed: {elapsed_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
}

/// Thin wrapper around an `indicatif` bar counting rows.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    /// Bar with a known row total.
    pub fn rows(label: impl Into<String>, total: u64) -> Self {
        Self::build(label.into(), total)
    }

    fn build(label: String, total: u64) -> Self {
        let pb = new_bar(total);
        pb.set_style(count_style());
        if !label.is_empty() {
            pb.set_message(label);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    #[inline]
    pub fn inc(&self, delta: u64) {
        self.pb.inc(delta);
    }

    pub fn finish(&self, msg: impl Into<String>) {
        self.pb.finish_with_message(msg.into());
    }
}
