use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;
use yt_comments::{
    extract_video_id, init_tracing_once, set_global_multiprogress, BasicStats, BasicStatsConfig, CommentsPipeline,
    PipelineOptions, StubSource, DEFAULT_BATCH_SIZE,
};

#[derive(Parser)]
#[command(name = "yt-comments", version, about = "YouTube comments bronze/silver/gold pipeline")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Project data directory (default: data).
    #[arg(long, global = true, env = "YT_COMMENTS_DATA_ROOT")]
    data_root: Option<PathBuf>,
    /// Show progress bars.
    #[arg(long, global = true)]
    progress: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape comments from a YouTube video into bronze.
    Scrape {
        /// YouTube video URL or 11-character video ID.
        video: String,
        /// Maximum number of comments to keep.
        #[arg(long, default_value_t = 200)]
        limit: usize,
        #[command(flatten)]
        overwrite: OverwriteArgs,
    },
    /// Build the silver parquet from bronze JSONL.
    Preprocess {
        /// YouTube video URL or 11-character video ID.
        video: String,
        /// Rows per parquet write batch.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[command(flatten)]
        overwrite: OverwriteArgs,
    },
    /// Compute gold basic stats from silver.
    Stats {
        /// YouTube video URL or 11-character video ID.
        video: String,
        #[command(flatten)]
        stats: StatsArgs,
    },
    /// Scrape, preprocess and compute stats for several videos.
    Run {
        /// YouTube video URLs or IDs.
        #[arg(required = true)]
        videos: Vec<String>,
        /// Maximum number of comments to keep per video.
        #[arg(long, default_value_t = 200)]
        limit: usize,
        /// Videos processed at once (default: number of CPUs).
        #[arg(long)]
        parallelism: Option<usize>,
        #[command(flatten)]
        overwrite: OverwriteArgs,
        #[command(flatten)]
        stats: StatsArgs,
    },
}

#[derive(Args, Clone, Copy)]
struct OverwriteArgs {
    /// Replace existing output (default).
    #[arg(long, overrides_with = "no_overwrite")]
    overwrite: bool,
    /// Append to bronze and refuse to replace an existing silver file.
    #[arg(long, overrides_with = "overwrite")]
    no_overwrite: bool,
}

impl OverwriteArgs {
    fn enabled(self) -> bool {
        !self.no_overwrite
    }
}

#[derive(Args)]
struct StatsArgs {
    /// Top N tokens.
    #[arg(long, default_value_t = 30)]
    top_n: usize,
    /// Min token length.
    #[arg(long, default_value_t = 2)]
    min_token_len: usize,
    /// Do not drop numeric tokens.
    #[arg(long)]
    keep_numeric: bool,
    /// Do not lowercase before tokenization.
    #[arg(long)]
    no_lowercase: bool,
    /// Do not drop stopwords.
    #[arg(long)]
    keep_stopwords: bool,
    /// Stopwords language.
    #[arg(long, default_value = "en")]
    lang: String,
    /// Rows per scanned batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

impl StatsArgs {
    fn config(&self) -> BasicStatsConfig {
        BasicStatsConfig::default()
            .with_top_n_tokens(self.top_n)
            .with_min_token_len(self.min_token_len)
            .with_drop_numeric_tokens(!self.keep_numeric)
            .with_lowercase(!self.no_lowercase)
            .with_drop_stopwords(!self.keep_stopwords)
            .with_stopwords_lang(self.lang.clone())
    }
}

fn stub_source() -> StubSource {
    tracing::warn!("No upstream API client configured. Using StubSource.");
    StubSource::new()
}

fn print_stats(stats: &BasicStats) {
    println!("video_id: {}", stats.video_id);
    println!("rows: {} | empty_text: {}", stats.row_count, stats.empty_text_count);
    println!("tokens: total={} | unique={}", stats.total_token_count, stats.unique_token_count);
    if stats.top_tokens.is_empty() {
        println!("top_tokens: (none)");
    } else {
        let preview: Vec<String> = stats.top_tokens.iter().take(10).map(|t| format!("{}:{}", t.token, t.count)).collect();
        println!("top_tokens: {}", preview.join(", "));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_once(cli.verbose);

    let mut opts = PipelineOptions::from_env().with_progress(cli.progress);
    if let Some(root) = &cli.data_root {
        opts = opts.with_data_root(root);
    }
    let base = CommentsPipeline::from_options(opts);

    match cli.command {
        Commands::Scrape { video, limit, overwrite } => {
            let video_id = extract_video_id(&video);
            let result = base
                .scrape_limit(limit)
                .overwrite(overwrite.enabled())
                .scrape(stub_source(), &video_id)
                .with_context(|| format!("scraping {video_id}"))?;
            println!("Saved {} comments to: {}", result.saved_count, result.path.display());
        }
        Commands::Preprocess { video, batch_size, overwrite } => {
            let video_id = extract_video_id(&video);
            let out = base
                .batch_size(batch_size)
                .overwrite(overwrite.enabled())
                .preprocess(&video_id)
                .with_context(|| format!("preprocessing {video_id}"))?;
            println!("Saved Silver parquet to: {}", out.display());
        }
        Commands::Stats { video, stats } => {
            let video_id = extract_video_id(&video);
            let result = base
                .batch_size(stats.batch_size)
                .stats(&video_id, &stats.config())
                .with_context(|| format!("computing stats for {video_id}"))?;
            print_stats(&result);
        }
        Commands::Run { videos, limit, parallelism, overwrite, stats } => {
            if cli.progress {
                set_global_multiprogress(Arc::new(MultiProgress::new()));
            }
            let mut video_ids: Vec<String> = videos.iter().map(|v| extract_video_id(v)).collect();
            video_ids.sort();
            video_ids.dedup();

            let mut pipeline = base.scrape_limit(limit).batch_size(stats.batch_size).overwrite(overwrite.enabled());
            if let Some(n) = parallelism {
                pipeline = pipeline.parallelism(n);
            }
            let reports = pipeline
                .run(&stub_source(), &video_ids, &stats.config())
                .context("running pipeline")?;
            for report in &reports {
                println!("Saved {} comments to: {}", report.scrape.saved_count, report.scrape.path.display());
                println!("Saved Silver parquet to: {}", report.silver_path.display());
                print_stats(&report.stats);
            }
        }
    }
    Ok(())
}
