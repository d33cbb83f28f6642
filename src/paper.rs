//! Core data model shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text shown in place of a summary that could not be generated.
pub const PLACEHOLDER_SUMMARY: &str = "Summary unavailable.";

/// Metadata for one discovered paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// arXiv identifier including version suffix (e.g. `2401.01234v2`)
    pub id: String,
    pub title: String,
    /// Authors in listed order
    pub authors: Vec<String>,
    pub abstract_text: String,
    /// Publication date as reported by the source (RFC 3339)
    pub published: String,
    /// Abstract page URL
    pub source_url: String,
    /// Direct PDF URL
    pub pdf_url: String,
}

impl PaperRecord {
    /// Publication day (`YYYY-MM-DD`), or the raw value if it is shorter.
    pub fn published_date(&self) -> &str {
        self.published.get(0..10).unwrap_or(&self.published)
    }
}

/// A generated or cached summary for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub id: String,
    pub text: String,
    pub generated_at: DateTime<Utc>,
    /// Set when the entry stands in for a failed summarization.
    /// Placeholders are never written to the cache.
    #[serde(default)]
    pub placeholder: bool,
}

impl SummaryEntry {
    pub fn new(id: impl Into<String>, text: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            generated_at,
            placeholder: false,
        }
    }

    pub fn placeholder(id: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: PLACEHOLDER_SUMMARY.to_string(),
            generated_at,
            placeholder: true,
        }
    }
}

/// One row of the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderItem {
    pub paper: PaperRecord,
    pub summary: SummaryEntry,
}

/// Ordered, deduplicated list of papers with their summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderModel {
    pub items: Vec<RenderItem>,
}

impl RenderModel {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Paper identifiers in page order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.paper.id.as_str()).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn paper(id: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            abstract_text: format!("Abstract of {}", id),
            published: "2024-09-08T00:00:00Z".to_string(),
            source_url: format!("https://arxiv.org/abs/{}", id),
            pdf_url: format!("https://arxiv.org/pdf/{}", id),
        }
    }

    pub fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-09-10T12:30:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }
}
