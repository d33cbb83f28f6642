//! arxiv-digest - arXiv keyword digest with casual LLM summaries
//!
//! Searches arXiv for each keyword, summarizes every new paper and writes a
//! static page with one card per paper.
//!
//! ## Usage
//!
//! ```bash
//! arxiv-digest run LLM RAG ./site
//! arxiv-digest --config my.yaml --csv out/papers.csv run "graph neural network" ./site
//! ```

use anyhow::{Context, Result};
use arxiv_digest::{
    arxiv::{ArxivClient, SearchOptions},
    cache::{CacheStore, JsonFileCache},
    config::{resolve_config_path, Config},
    document::PdfDocumentSource,
    export,
    pipeline::Pipeline,
    render::PageRenderer,
    summarizer::{OpenAiSummarizer, SummarizerConfig},
};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// arXiv keyword digest with casual LLM summaries
#[derive(Parser)]
#[command(name = "arxiv-digest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to the YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Regenerate summaries even when cached
    #[arg(long, global = true)]
    force: bool,

    /// Also export the results as CSV
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Directory for per-run log files
    #[arg(long, global = true, default_value = "./logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, summarize and render the digest page
    Run {
        /// Search keywords, each searched separately
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,

        /// Directory the page is written to
        output_dir: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _guard = init_logging(cli.debug, &cli.log_dir);

    match cli.command {
        Commands::Run {
            keywords,
            output_dir,
        } => run_digest(keywords, output_dir, cli.config, cli.force, cli.csv).await,
    }
}

fn init_logging(debug: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let console = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_name = format!("{}.log", Local::now().format("%Y%m%d-%H%M%S"));
            let appender = tracing_appender::rolling::never(log_dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Cannot create log directory {:?}: {}", log_dir, e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    guard
}

// ============================================================================
// Digest Pipeline
// ============================================================================

async fn run_digest(
    keywords: Vec<String>,
    output_dir: PathBuf,
    config_path: Option<PathBuf>,
    force: bool,
    csv: Option<PathBuf>,
) -> Result<()> {
    let config_path =
        resolve_config_path(config_path.as_deref()).context("No usable configuration")?;
    let config = Config::load(&config_path)
        .with_context(|| format!("Invalid configuration in {:?}", config_path))?;
    info!(path = %config_path.display(), model = %config.openai.model, "Configuration loaded");

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    println!("\n{}", "=".repeat(60));
    println!("arXiv Digest");
    println!("{}", "=".repeat(60));
    println!("Keywords: {}", keywords.join(", "));
    println!("Output:   {:?}", output_dir);
    println!("{}\n", "=".repeat(60));

    let fetcher = ArxivClient::new(SearchOptions {
        max_results: config.search.max_results,
        days_back: config.search.days_back,
    })?;
    let documents = PdfDocumentSource::new(
        Duration::from_secs(config.download.delay_secs),
        config.download.keep_dir.clone(),
    )?;
    let summarizer = OpenAiSummarizer::new(SummarizerConfig::from(&config))?;
    let mut cache = JsonFileCache::open(&config.cache.path);
    info!(path = %cache.path().display(), entries = cache.len(), "Cache opened");

    let report = Pipeline::new(&fetcher, &documents, &summarizer, &mut cache)
        .force(force)
        .run(&keywords)
        .await;

    let stats = &report.stats;
    info!(
        searched = stats.keywords_searched,
        failed = stats.keywords_failed,
        duplicates = stats.duplicates,
        cache_hits = stats.cache_hits,
        generated = stats.generated,
        placeholders = stats.placeholders,
        abstract_fallbacks = stats.abstract_fallbacks,
        "Pipeline finished"
    );
    for keyword in &report.failed_keywords {
        warn!(keyword = %keyword, "Keyword skipped after search failure");
    }

    let usage = summarizer.token_usage();
    if usage.total_tokens > 0 {
        info!(
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            total = usage.total_tokens,
            "Token usage"
        );
    }

    let index = PageRenderer::new(config.page.title.clone())
        .write_site(&output_dir, &report.model, Utc::now())
        .context("Failed to write page")?;

    if let Some(csv_path) = csv {
        export::write_csv(&csv_path, &report.model).context("Failed to export CSV")?;
        println!("Saved: {:?}", csv_path);
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Done: {} papers ({} new summaries, {} cached, {} unavailable)",
        report.model.len(),
        stats.generated,
        stats.cache_hits,
        stats.placeholders
    );
    println!("Page: {:?}", index);
    println!("{}", "=".repeat(60));

    Ok(())
}
