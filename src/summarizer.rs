//! LLM-based paper summarization.
//!
//! Sends one chat-completion request per paper to an OpenAI-compatible API and
//! turns the reply into a [`SummaryEntry`].

use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::paper::{PaperRecord, SummaryEntry};
use crate::prompts::summary::{build_user_prompt, truncate_middle, SYSTEM_PROMPT, USER_PROMPT_TEMPLATE};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Attempts per paper before giving up
const MAX_ATTEMPTS: u32 = 3;

const TEMPERATURE: f64 = 0.7;

const MAX_TOKENS: u32 = 500;

/// Longest pause honored from a `Retry-After` header
const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

/// Produces a summary for one paper.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, paper: &PaperRecord, full_text: &str) -> Result<SummaryEntry>;
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub max_input_chars: usize,
    pub greeting: Option<String>,
    pub template: Option<String>,
}

impl From<&Config> for SummarizerConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.openai.base_url.clone(),
            api_key: config.openai.api_key.clone(),
            model: config.openai.model.clone(),
            language: config.summary.language.clone(),
            max_input_chars: config.summary.max_input_chars,
            greeting: config.summary.greeting.clone(),
            template: config.summary.template.clone(),
        }
    }
}

/// Token usage tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Accumulated token usage with atomic counters
#[derive(Default)]
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    config: SummarizerConfig,
    usage: AtomicTokenUsage,
    retry_base: Duration,
}

impl OpenAiSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            usage: AtomicTokenUsage::default(),
            retry_base: Duration::from_secs(2),
        })
    }

    /// Override the first retry backoff (doubles on every retry)
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    /// Tokens spent so far by this summarizer
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.get()
    }

    fn build_prompt(&self, paper: &PaperRecord, full_text: &str) -> String {
        let template = self
            .config
            .template
            .as_deref()
            .unwrap_or(USER_PROMPT_TEMPLATE);
        let paper_text = truncate_middle(full_text, self.config.max_input_chars);
        build_user_prompt(
            template,
            &paper.title,
            &paper.abstract_text,
            &paper_text,
            &self.config.language,
        )
    }

    /// Send one completion request and return the trimmed reply
    async fn complete(&self, user_prompt: &str) -> Result<String> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS
        });

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(DigestError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(DigestError::RateLimited(retry_after));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DigestError::Api {
                code: status.as_u16(),
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DigestError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(u) = api_response.usage {
            self.usage.add(&TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
        }

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(DigestError::Parse("LLM returned an empty summary".to_string()));
        }
        Ok(content)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, paper: &PaperRecord, full_text: &str) -> Result<SummaryEntry> {
        let user_prompt = self.build_prompt(paper, full_text);
        debug!(id = %paper.id, prompt_chars = user_prompt.chars().count(), "Built summary prompt");

        let mut backoff = self.retry_base;
        let mut attempt = 1;

        let content = loop {
            match self.complete(&user_prompt).await {
                Ok(content) => break content,
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let wait = retry_wait(&e, backoff);
                    warn!(
                        id = %paper.id,
                        attempt = attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Summary request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(DigestError::summarize(&paper.id, e)),
            }
        };

        let text = match &self.config.greeting {
            Some(greeting) => format!("{}{}", greeting, content),
            None => content,
        };

        info!(
            id = %paper.id,
            model = %self.config.model,
            chars = text.chars().count(),
            "Summary generated"
        );

        Ok(SummaryEntry::new(paper.id.clone(), text, Utc::now()))
    }
}

/// Pause before the next attempt: the server's `Retry-After` when longer
/// than the backoff, never above [`MAX_RETRY_WAIT`]
fn retry_wait(error: &DigestError, backoff: Duration) -> Duration {
    let wait = match error {
        DigestError::RateLimited(secs) => Duration::from_secs(*secs).max(backoff),
        _ => backoff,
    };
    wait.min(MAX_RETRY_WAIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::fixtures::paper;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> SummarizerConfig {
        SummarizerConfig {
            base_url: format!("{}/v1/", base_url),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            language: "English".to_string(),
            max_input_chars: 100,
            greeting: None,
            template: None,
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        })
    }

    #[tokio::test]
    async fn test_summarize_success() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  So cool!  ")))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.greeting = Some("Hey all! ".to_string());
        let summarizer = OpenAiSummarizer::new(cfg)?;

        let entry = summarizer.summarize(&paper("P1"), "full text").await?;
        assert_eq!(entry.id, "P1");
        assert_eq!(entry.text, "Hey all! So cool!");
        assert!(!entry.placeholder);
        assert_eq!(summarizer.token_usage().total_tokens, 150);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_response_is_summarize_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
            .expect(3)
            .mount(&server)
            .await;

        let summarizer =
            OpenAiSummarizer::new(config(&server.uri()))?.with_retry_base(Duration::from_millis(1));
        let err = summarizer.summarize(&paper("P2"), "text").await.unwrap_err();
        assert!(matches!(err, DigestError::Summarize { ref id, .. } if id == "P2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_after_rate_limit() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Recovered.")))
            .mount(&server)
            .await;

        let summarizer =
            OpenAiSummarizer::new(config(&server.uri()))?.with_retry_base(Duration::from_millis(1));
        let entry = summarizer.summarize(&paper("P4"), "text").await?;
        assert_eq!(entry.text, "Recovered.");
        Ok(())
    }

    #[test]
    fn test_retry_wait_is_capped() {
        let backoff = Duration::from_secs(2);
        assert_eq!(retry_wait(&DigestError::RateLimited(5), backoff), Duration::from_secs(5));
        assert_eq!(retry_wait(&DigestError::RateLimited(0), backoff), backoff);
        assert_eq!(retry_wait(&DigestError::RateLimited(86_400), backoff), MAX_RETRY_WAIT);
        assert_eq!(retry_wait(&DigestError::Parse("empty".into()), backoff), backoff);
        assert_eq!(
            retry_wait(&DigestError::Parse("empty".into()), Duration::from_secs(600)),
            MAX_RETRY_WAIT
        );
    }

    #[test]
    fn test_prompt_truncates_long_text() -> Result<()> {
        let summarizer = OpenAiSummarizer::new(config("http://localhost"))?;
        let long_text = format!("{}{}{}", "h".repeat(50), "m".repeat(500), "t".repeat(50));
        let prompt = summarizer.build_prompt(&paper("P5"), &long_text);
        assert!(prompt.contains("Title: Paper P5"));
        assert!(prompt.contains("...(omitted)..."));
        assert!(!prompt.contains(&"m".repeat(60)));
        Ok(())
    }

    #[test]
    fn test_custom_template() -> Result<()> {
        let mut cfg = config("http://localhost");
        cfg.template = Some("[{language}] {title} :: {paper_text}".to_string());
        let summarizer = OpenAiSummarizer::new(cfg)?;
        let prompt = summarizer.build_prompt(&paper("P6"), "body");
        assert_eq!(prompt, "[English] Paper P6 :: body");
        Ok(())
    }
}
