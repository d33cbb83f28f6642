//! Pipeline orchestration.
//!
//! Keywords -> arXiv search -> dedup -> cache lookup -> full text + summary on a
//! miss -> cache write -> [`RenderModel`]. Per-item failures are logged and
//! absorbed here; nothing below this level aborts the run.

use crate::arxiv::PaperFetcher;
use crate::cache::CacheStore;
use crate::document::DocumentSource;
use crate::paper::{PaperRecord, RenderItem, RenderModel, SummaryEntry};
use crate::summarizer::Summarizer;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub keywords_searched: usize,
    pub keywords_failed: usize,
    /// Hits dropped because an earlier keyword already found the paper
    pub duplicates: usize,
    pub cache_hits: usize,
    pub generated: usize,
    pub placeholders: usize,
    /// Summaries built from the abstract because the full text was unavailable
    pub abstract_fallbacks: usize,
}

/// Outcome of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct RunReport {
    pub model: RenderModel,
    pub stats: RunStats,
    pub failed_keywords: Vec<String>,
}

/// Wires the collaborators together for one run.
pub struct Pipeline<'a> {
    fetcher: &'a dyn PaperFetcher,
    documents: &'a dyn DocumentSource,
    summarizer: &'a dyn Summarizer,
    cache: &'a mut dyn CacheStore,
    force: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: &'a dyn PaperFetcher,
        documents: &'a dyn DocumentSource,
        summarizer: &'a dyn Summarizer,
        cache: &'a mut dyn CacheStore,
    ) -> Self {
        Self {
            fetcher,
            documents,
            summarizer,
            cache,
            force: false,
        }
    }

    /// Ignore cached summaries and regenerate everything (results are still cached)
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Run the whole pipeline for `keywords`, in order.
    pub async fn run(&mut self, keywords: &[String]) -> RunReport {
        let mut stats = RunStats::default();
        let mut failed_keywords = Vec::new();

        let papers = self
            .discover(keywords, &mut stats, &mut failed_keywords)
            .await;

        info!(
            unique = papers.len(),
            duplicates = stats.duplicates,
            failed_keywords = stats.keywords_failed,
            "Discovery complete"
        );

        let mut items = Vec::with_capacity(papers.len());
        for (idx, paper) in papers.into_iter().enumerate() {
            debug!(idx = idx, id = %paper.id, "Processing paper");
            let summary = self.summary_for(&paper, &mut stats).await;
            items.push(RenderItem { paper, summary });
        }

        info!(
            papers = items.len(),
            cache_hits = stats.cache_hits,
            generated = stats.generated,
            placeholders = stats.placeholders,
            "Pipeline complete"
        );

        RunReport {
            model: RenderModel { items },
            stats,
            failed_keywords,
        }
    }

    /// Search every keyword and merge the hits, first occurrence wins.
    async fn discover(
        &self,
        keywords: &[String],
        stats: &mut RunStats,
        failed_keywords: &mut Vec<String>,
    ) -> Vec<PaperRecord> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut papers = Vec::new();

        for keyword in keywords {
            stats.keywords_searched += 1;
            match self.fetcher.search(keyword).await {
                Ok(results) => {
                    let found = results.len();
                    let mut added = 0;
                    for paper in results {
                        if seen.insert(paper.id.clone()) {
                            papers.push(paper);
                            added += 1;
                        } else {
                            stats.duplicates += 1;
                        }
                    }
                    info!(keyword = %keyword, found = found, new = added, "Keyword searched");
                }
                Err(e) => {
                    stats.keywords_failed += 1;
                    failed_keywords.push(keyword.clone());
                    error!(keyword = %keyword, error = %e, "Search failed, skipping keyword");
                }
            }
        }

        papers
    }

    /// Cached summary, or a fresh one, or a placeholder.
    async fn summary_for(&mut self, paper: &PaperRecord, stats: &mut RunStats) -> SummaryEntry {
        if !self.force {
            if let Some(entry) = self.cache.lookup(&paper.id) {
                debug!(id = %paper.id, "Cache hit");
                stats.cache_hits += 1;
                return entry;
            }
        }

        let full_text = match self.documents.full_text(paper).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    id = %paper.id,
                    error = %e,
                    "Full text unavailable, summarizing from the abstract"
                );
                stats.abstract_fallbacks += 1;
                paper.abstract_text.clone()
            }
        };

        match self.summarizer.summarize(paper, &full_text).await {
            Ok(entry) => {
                stats.generated += 1;
                if let Err(e) = self.cache.store(entry.clone()) {
                    warn!(id = %paper.id, error = %e, "Failed to write summary to cache");
                }
                entry
            }
            Err(e) => {
                error!(
                    id = %paper.id,
                    title = %paper.title.chars().take(50).collect::<String>(),
                    error = %e,
                    "Summary failed, using placeholder"
                );
                stats.placeholders += 1;
                SummaryEntry::placeholder(paper.id.clone(), Utc::now())
            }
        }
    }
}
