//! arXiv API client
//!
//! Keyword search against the arXiv export API, which answers with an Atom feed.
//!
//! API Best Practices (per arXiv docs):
//! - Keep to roughly one request every three seconds
//! - `submittedDate:[YYYYMMDDHHMM TO YYYYMMDDHHMM]` restricts the window
//! - Retry 503/429 with backoff

use crate::error::{DigestError, OptionExt, Result};
use crate::paper::PaperRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// arXiv export API endpoint
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

const USER_AGENT: &str = concat!("arxiv-digest/", env!("CARGO_PKG_VERSION"));

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

const MAX_RETRIES: u32 = 3;

/// Widest submission window accepted, in days
pub const MAX_DAYS_BACK: i64 = 36_500;

/// Keyword search over a paper repository.
#[async_trait]
pub trait PaperFetcher: Send + Sync {
    /// Papers matching `keyword`, in the repository's relevance order.
    async fn search(&self, keyword: &str) -> Result<Vec<PaperRecord>>;
}

/// Search options for arXiv queries
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum results per keyword
    pub max_results: usize,
    /// Submission window in days, counted back from now
    pub days_back: i64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 100,
            days_back: 30,
        }
    }
}

/// arXiv client implementing [`PaperFetcher`]
pub struct ArxivClient {
    client: Client,
    endpoint: Url,
    options: SearchOptions,
    retry_base: Duration,
}

impl ArxivClient {
    pub fn new(options: SearchOptions) -> Result<Self> {
        Self::with_endpoint(ARXIV_API_URL, options)
    }

    /// Client against a custom endpoint (mirrors, tests)
    pub fn with_endpoint(endpoint: &str, options: SearchOptions) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| DigestError::Config(format!("Invalid arXiv endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            options,
            retry_base: Duration::from_secs(1),
        })
    }

    /// Override the first backoff interval (doubles on every retry)
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn search_url(&self, keyword: &str, now: DateTime<Utc>) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("search_query", &build_search_query(keyword, now, self.options.days_back))
            .append_pair("start", "0")
            .append_pair("max_results", &self.options.max_results.to_string())
            .append_pair("sortBy", "relevance")
            .append_pair("sortOrder", "descending");
        url
    }

    /// Fetch feed content, backing off on rate limits
    async fn fetch_feed(&self, url: &Url) -> Result<String> {
        let mut retries = 0;

        loop {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status.is_success() {
                return response.text().await.map_err(DigestError::Network);
            }

            let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::SERVICE_UNAVAILABLE;

            if retryable {
                if retries < MAX_RETRIES {
                    let backoff = self.retry_base * 2u32.pow(retries);
                    warn!(
                        retries = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        status = status.as_u16(),
                        "arXiv busy, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                    continue;
                }
                return Err(DigestError::RateLimited(60));
            }

            return Err(DigestError::Api {
                code: status.as_u16(),
                message: format!("arXiv API error: {}", status),
            });
        }
    }
}

#[async_trait]
impl PaperFetcher for ArxivClient {
    async fn search(&self, keyword: &str) -> Result<Vec<PaperRecord>> {
        let url = self.search_url(keyword, Utc::now());
        info!(
            keyword = keyword,
            max_results = self.options.max_results,
            days_back = self.options.days_back,
            "Searching arXiv"
        );
        debug!(url = %url, "arXiv query");

        let body = self
            .fetch_feed(&url)
            .await
            .map_err(|e| DigestError::fetch(keyword, e))?;
        let papers = parse_feed(&body).map_err(|e| DigestError::fetch(keyword, e))?;

        info!(keyword = keyword, count = papers.len(), "arXiv search complete");
        Ok(papers)
    }
}

/// Build the `search_query` value: keyword clause AND submission window
fn build_search_query(keyword: &str, now: DateTime<Utc>, days_back: i64) -> String {
    let keyword = keyword.trim();
    let term = if keyword.contains(char::is_whitespace) {
        format!("all:\"{}\"", keyword.replace('"', ""))
    } else {
        format!("all:{}", keyword)
    };

    let since = now - ChronoDuration::days(days_back.clamp(1, MAX_DAYS_BACK));
    format!(
        "{} AND submittedDate:[{} TO {}]",
        term,
        since.format("%Y%m%d%H%M"),
        now.format("%Y%m%d%H%M")
    )
}

/// Matches new-style (`2401.00001v1`) and old-style (`cs/9901001v1`) ids
fn id_regex() -> Result<Regex> {
    Regex::new(r"/abs/([^/?#]+(?:/[^/?#]+)?)/?$").map_err(|e| DigestError::Parse(e.to_string()))
}

/// Extract the arXiv id (with version) from an entry id URL
fn arxiv_id_from_url(id_regex: &Regex, url: &str) -> Option<String> {
    id_regex
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Entry fields collected while walking the feed
#[derive(Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    abs_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn link(&mut self, e: &BytesStart<'_>) {
        let mut rel = None;
        let mut ty = None;
        let mut title = None;
        let mut href = None;
        for attr in e.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_default();
            match attr.key.as_ref() {
                b"rel" => rel = Some(value),
                b"type" => ty = Some(value),
                b"title" => title = Some(value),
                b"href" => href = Some(value),
                _ => {}
            }
        }

        if title.as_deref() == Some("pdf") || ty.as_deref() == Some("application/pdf") {
            self.pdf_url = href;
        } else if rel.as_deref() == Some("alternate") {
            self.abs_url = href;
        }
    }

    fn build(self, id_regex: &Regex) -> Result<PaperRecord> {
        let id = arxiv_id_from_url(id_regex, &self.id_url).ok_or_parse("entry without arXiv id")?;
        let source_url = self
            .abs_url
            .unwrap_or_else(|| format!("https://arxiv.org/abs/{}", id));
        let pdf_url = self
            .pdf_url
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", id));

        Ok(PaperRecord {
            id,
            title: self.title,
            authors: self.authors,
            abstract_text: self.summary,
            published: self.published,
            source_url,
            pdf_url,
        })
    }
}

/// Parse an arXiv Atom feed into paper records, in feed order.
fn parse_feed(body: &str) -> Result<Vec<PaperRecord>> {
    let id_regex = id_regex()?;
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut text = String::new();
    let mut saw_feed = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                text.clear();
                match e.local_name().as_ref() {
                    b"feed" => saw_feed = true,
                    b"entry" => entry = Some(EntryBuilder::default()),
                    b"author" => in_author = true,
                    b"link" => {
                        if let Some(cur) = entry.as_mut() {
                            cur.link(&e);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(cur) = entry.as_mut() {
                        cur.link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let chunk = t
                    .unescape()
                    .map_err(|e| DigestError::Parse(format!("Bad text in arXiv feed: {}", e)))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"entry" {
                    if let Some(done) = entry.take() {
                        match done.build(&id_regex) {
                            Ok(paper) => papers.push(paper),
                            Err(e) => warn!(error = %e, "Skipping malformed arXiv entry"),
                        }
                    }
                } else if let Some(cur) = entry.as_mut() {
                    match name.as_ref() {
                        b"id" => cur.id_url = normalize_ws(&text),
                        b"title" => cur.title = normalize_ws(&text),
                        b"summary" => cur.summary = normalize_ws(&text),
                        b"published" => cur.published = normalize_ws(&text),
                        b"name" if in_author => {
                            let author = normalize_ws(&text);
                            if !author.is_empty() {
                                cur.authors.push(author);
                            }
                        }
                        b"author" => in_author = false,
                        _ => {}
                    }
                }
                text.clear();
            }
            Ok(_) => {}
            Err(e) => {
                return Err(DigestError::Parse(format!(
                    "Malformed arXiv feed at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if !saw_feed {
        return Err(DigestError::Parse("Response is not an Atom feed".to_string()));
    }

    Ok(papers)
}
