//! Full-text retrieval: download a paper's PDF and extract its text.

use crate::error::{DigestError, Result};
use crate::paper::PaperRecord;
use async_trait::async_trait;
use lopdf::Document;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Request timeout in seconds (PDFs can be large)
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Upper bound of the random extra pause added to the polite delay
const JITTER_MS: u64 = 1000;

const USER_AGENT: &str = concat!("arxiv-digest/", env!("CARGO_PKG_VERSION"));

/// Source of a paper's full text.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn full_text(&self, paper: &PaperRecord) -> Result<String>;
}

/// Downloads PDFs over HTTP and extracts their text with `lopdf`.
pub struct PdfDocumentSource {
    client: Client,
    delay: Duration,
    keep_dir: Option<PathBuf>,
}

impl PdfDocumentSource {
    /// # Arguments
    ///
    /// * `delay` - Pause before each download to stay polite with the server
    /// * `keep_dir` - Directory to keep downloaded PDFs in, if any
    pub fn new(delay: Duration, keep_dir: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            delay,
            keep_dir,
        })
    }

    async fn download(&self, paper: &PaperRecord) -> Result<Vec<u8>> {
        if !self.delay.is_zero() {
            let jitter = rand::random::<u64>() % JITTER_MS;
            tokio::time::sleep(self.delay + Duration::from_millis(jitter)).await;
        }

        debug!(id = %paper.id, url = %paper.pdf_url, "Downloading PDF");
        let response = self.client.get(&paper.pdf_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Api {
                code: status.as_u16(),
                message: format!("PDF download failed: {}", status),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn keep_copy(&self, paper: &PaperRecord, bytes: &[u8]) {
        let Some(dir) = &self.keep_dir else {
            return;
        };
        // Old-style ids contain a slash
        let path = dir.join(format!("{}.pdf", paper.id.replace('/', "_")));
        let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, bytes));
        if let Err(e) = result {
            warn!(id = %paper.id, error = %e, "Failed to keep PDF copy");
        }
    }
}

#[async_trait]
impl DocumentSource for PdfDocumentSource {
    async fn full_text(&self, paper: &PaperRecord) -> Result<String> {
        let bytes = self.download(paper).await?;
        self.keep_copy(paper, &bytes);

        let text = extract_pdf_text(&bytes)?;
        info!(id = %paper.id, chars = text.chars().count(), "Extracted PDF text");
        Ok(text)
    }
}

/// Extract the text of every page, pages separated by a blank line.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes).map_err(|e| DigestError::Pdf(e.to_string()))?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(DigestError::Pdf("PDF has no pages".to_string()));
    }

    let mut parts = Vec::with_capacity(pages.len());
    for page in &pages {
        match doc.extract_text(&[*page]) {
            Ok(text) => parts.push(normalize_text(&text)),
            Err(e) => debug!(page = page, error = %e, "Skipping unreadable page"),
        }
        if page % 10 == 0 {
            debug!(page = page, total = pages.len(), "Extracting pages");
        }
    }

    let text = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if text.is_empty() {
        return Err(DigestError::Pdf("No extractable text".to_string()));
    }
    Ok(text)
}

/// Collapse runs of whitespace inside each line and drop blank lines
fn normalize_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
