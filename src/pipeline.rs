use crate::bronze::JsonlBronzeStore;
use crate::concurrency::for_each_video_limited;
use crate::config::PipelineOptions;
use crate::date::now_utc;
use crate::error::Result;
use crate::gold::{GoldStore, ParquetGoldStore};
use crate::models::{BasicStats, BasicStatsConfig};
use crate::paths::{bronze_dir, gold_dir, silver_dir};
use crate::silver::{ParquetSilverStore, PreprocessService, SilverStore, PREPROCESS_VERSION};
use crate::source::{CommentSource, ScrapeResult, ScrapeService};
use crate::stats::BasicStatsService;
use crate::text::TextPreprocessor;
use std::path::{Path, PathBuf};

/// Every stage for one video, wired over a single data root.
#[derive(Clone, Debug, Default)]
pub struct CommentsPipeline {
    pub(crate) opts: PipelineOptions,
}

/// Outcome of a full scrape → preprocess → stats run for one video.
#[derive(Clone, Debug)]
pub struct VideoReport {
    pub scrape: ScrapeResult,
    pub silver_path: PathBuf,
    pub stats: BasicStats,
}

impl CommentsPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    // -------- Builder methods --------
    pub fn data_root(mut self, root: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_root(root); self }
    pub fn batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_size(n); self }
    pub fn overwrite(mut self, yes: bool) -> Self { self.opts = self.opts.with_overwrite(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn scrape_limit(mut self, n: usize) -> Self { self.opts = self.opts.with_scrape_limit(n); self }
    pub fn url_placeholder(mut self, placeholder: impl Into<String>) -> Self { self.opts = self.opts.with_url_placeholder(placeholder); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Stores --------
    pub fn bronze_store(&self) -> JsonlBronzeStore {
        JsonlBronzeStore::new(bronze_dir(&self.opts.data_root))
            .with_io_buffers(self.opts.read_buffer_bytes, self.opts.write_buffer_bytes)
    }

    pub fn silver_store(&self) -> ParquetSilverStore {
        ParquetSilverStore::new(silver_dir(&self.opts.data_root))
    }

    pub fn gold_store(&self) -> ParquetGoldStore {
        ParquetGoldStore::new(gold_dir(&self.opts.data_root))
    }

    // -------- Stages --------

    /// Source → bronze.
    pub fn scrape<S: CommentSource>(&self, source: S, video_id: &str) -> Result<ScrapeResult> {
        let service = ScrapeService::new(source, self.bronze_store());
        let service = match self.opts.scrape_limit {
            Some(n) => service.with_limit(n),
            None => service,
        };
        service.run(video_id, self.opts.overwrite)
    }

    /// Bronze → silver.
    pub fn preprocess(&self, video_id: &str) -> Result<PathBuf> {
        PreprocessService::new(
            self.bronze_store(),
            self.silver_store(),
            TextPreprocessor::new(self.opts.url_placeholder.clone()),
        )
        .progress(self.opts.progress)
        .run(video_id, self.opts.overwrite, self.opts.batch_size)
    }

    /// Silver → gold. Always recomputed from scratch and overwrites any prior gold.
    pub fn stats(&self, video_id: &str, config: &BasicStatsConfig) -> Result<BasicStats> {
        let silver_path = self.silver_store().path_for(video_id);
        let stats = BasicStatsService::new(PREPROCESS_VERSION)
            .progress(self.opts.progress)
            .compute_for_video(video_id, &silver_path, config, now_utc(), self.opts.batch_size)?;
        self.gold_store().save(&stats)?;
        Ok(stats)
    }

    /// Scrape, preprocess and compute stats for each video. Videos are
    /// independent, so up to `parallelism` of them run at once.
    pub fn run<S: CommentSource + Sync>(
        &self,
        source: &S,
        video_ids: &[String],
        config: &BasicStatsConfig,
    ) -> Result<Vec<VideoReport>> {
        if let Some(n) = self.opts.parallelism { if n > 0 { rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok(); } }
        let limit = self.opts.parallelism.unwrap_or_else(rayon::current_num_threads);
        tracing::info!("Planned {} videos, up to {} at a time.", video_ids.len(), limit.max(1));

        for_each_video_limited(video_ids, limit, |vid| {
            let scrape = self.scrape(source, vid)?;
            let silver_path = self.preprocess(vid)?;
            let stats = self.stats(vid, config)?;
            Ok(VideoReport { scrape, silver_path, stats })
        })
    }
}
