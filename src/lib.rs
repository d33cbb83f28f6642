//! # arxiv-digest
//!
//! Search arXiv by keyword, summarize each paper with an LLM in a casual tone,
//! and publish the results as a static page.
//!
//! ## Modules
//!
//! - [`arxiv`] - arXiv Atom API client
//! - [`document`] - PDF download and text extraction
//! - [`summarizer`] - OpenAI-compatible summary generation
//! - [`cache`] - Summary cache keyed by paper id
//! - [`pipeline`] - Orchestration of one run
//! - [`render`] - Static page generation
//! - [`export`] - CSV export
//! - [`config`] - YAML configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arxiv_digest::arxiv::{ArxivClient, SearchOptions};
//! use arxiv_digest::cache::JsonFileCache;
//! use arxiv_digest::document::PdfDocumentSource;
//! use arxiv_digest::pipeline::Pipeline;
//! use arxiv_digest::render::PageRenderer;
//! use arxiv_digest::summarizer::{OpenAiSummarizer, SummarizerConfig};
//! use arxiv_digest::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml".as_ref())?;
//!     let fetcher = ArxivClient::new(SearchOptions::default())?;
//!     let documents = PdfDocumentSource::new(std::time::Duration::from_secs(5), None)?;
//!     let summarizer = OpenAiSummarizer::new(SummarizerConfig::from(&config))?;
//!     let mut cache = JsonFileCache::open(&config.cache.path);
//!
//!     let report = Pipeline::new(&fetcher, &documents, &summarizer, &mut cache)
//!         .run(&["LLM".to_string(), "RAG".to_string()])
//!         .await;
//!     PageRenderer::default().write_site("site".as_ref(), &report.model, chrono::Utc::now())?;
//!     Ok(())
//! }
//! ```

pub mod arxiv;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod paper;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod summarizer;

pub use config::Config;
pub use error::{DigestError, Result};
pub use paper::{PaperRecord, RenderItem, RenderModel, SummaryEntry};
