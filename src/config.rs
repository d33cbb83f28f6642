//! YAML configuration.
//!
//! Loaded once at startup into an immutable [`Config`]. Only `openai.api_key`
//! is required; every other option has a default.

use crate::arxiv::MAX_DAYS_BACK;
use crate::error::{DigestError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const APP_DIR: &str = "arxiv-digest";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results requested per keyword
    pub max_results: usize,
    /// Only papers submitted within this many days
    pub days_back: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            days_back: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Output language of the summary
    pub language: String,
    /// Paper text longer than this is cut in the middle
    pub max_input_chars: usize,
    /// Prefixed to every generated summary
    pub greeting: Option<String>,
    /// Custom user prompt; placeholders `{title}`, `{abstract}`, `{paper_text}`, `{language}`
    pub template: Option<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            max_input_chars: 10_000,
            greeting: None,
            template: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./cache/summary_cache.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Pause before each PDF download
    pub delay_secs: u64,
    /// Keep downloaded PDFs here when set
    pub keep_dir: Option<PathBuf>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            delay_secs: 5,
            keep_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub title: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: "arXiv Paper Digest".to_string(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| DigestError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DigestError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), model = %config.openai.model, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(DigestError::Config("openai.api_key is required".to_string()));
        }
        if self.openai.model.trim().is_empty() {
            return Err(DigestError::Config("openai.model must not be empty".to_string()));
        }
        if self.search.max_results == 0 {
            return Err(DigestError::Config("search.max_results must be at least 1".to_string()));
        }
        if !(1..=MAX_DAYS_BACK).contains(&self.search.days_back) {
            return Err(DigestError::Config(format!(
                "search.days_back must be between 1 and {}",
                MAX_DAYS_BACK
            )));
        }
        if self.summary.max_input_chars == 0 {
            return Err(DigestError::Config(
                "summary.max_input_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locate the config file: explicit path, then `./config.yaml`, then the user config dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE_NAME));
    }

    for candidate in &candidates {
        debug!(path = %candidate.display(), "Checking config location");
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }

    Err(DigestError::Config(format!(
        "No configuration found (tried {})",
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_config_uses_defaults() -> Result<()> {
        let config = Config::from_yaml_str("openai:\n  api_key: sk-test\n")?;
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.search.max_results, 100);
        assert_eq!(config.search.days_back, 30);
        assert_eq!(config.summary.max_input_chars, 10_000);
        assert_eq!(config.cache.path, PathBuf::from("./cache/summary_cache.json"));
        Ok(())
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = Config::from_yaml_str("openai:\n  model: gpt-4o\n").unwrap_err();
        assert!(matches!(err, DigestError::Config(ref m) if m.contains("api_key")));

        let err = Config::from_yaml_str("search:\n  days_back: 7\n").unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn test_days_back_out_of_range_is_config_error() {
        let err = Config::from_yaml_str("openai:\n  api_key: sk\nsearch:\n  days_back: 200000000\n")
            .unwrap_err();
        assert!(matches!(err, DigestError::Config(ref m) if m.contains("days_back")));

        let err = Config::from_yaml_str("openai:\n  api_key: sk\nsearch:\n  days_back: 0\n")
            .unwrap_err();
        assert!(err.is_fatal());

        assert!(Config::from_yaml_str("openai:\n  api_key: sk\nsearch:\n  days_back: 36500\n").is_ok());
    }

    #[test]
    fn test_malformed_yaml_is_fatal_config_error() {
        let err = Config::from_yaml_str("openai: [unclosed\n").unwrap_err();
        assert!(matches!(err, DigestError::Config(ref m) if m.starts_with("Invalid configuration")));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let err = Config::from_yaml_str("openai:\n  api_key: '  '\n").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_full_config() -> Result<()> {
        let yaml = r#"
openai:
  api_key: sk-test
  model: gpt-4o
  base_url: http://localhost:8080/v1
search:
  max_results: 20
  days_back: 7
summary:
  language: Japanese
  greeting: "Hi all! "
  template: "Summarize {title} in {language}: {paper_text}"
cache:
  path: /tmp/cache.json
download:
  delay_secs: 0
  keep_dir: ./dl
page:
  title: My Digest
"#;
        let config = Config::from_yaml_str(yaml)?;
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.summary.language, "Japanese");
        assert_eq!(config.summary.greeting.as_deref(), Some("Hi all! "));
        assert_eq!(config.download.delay_secs, 0);
        assert_eq!(config.download.keep_dir, Some(PathBuf::from("./dl")));
        assert_eq!(config.page.title, "My Digest");
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "openai:\n  api_key: sk-file")?;
        let config = Config::load(file.path())?;
        assert_eq!(config.openai.api_key, "sk-file");
        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn test_resolve_explicit_path() -> Result<()> {
        let path = resolve_config_path(Some(Path::new("/etc/digest.yaml")))?;
        assert_eq!(path, PathBuf::from("/etc/digest.yaml"));
        Ok(())
    }
}
