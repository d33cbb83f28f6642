//! Static page generation.
//!
//! Writes `index.html` plus its stylesheet and copy script into the output
//! directory. The page needs no network access once written.

use crate::error::{DigestError, Result};
use crate::paper::{RenderItem, RenderModel};
use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the generated page
pub const INDEX_FILE: &str = "index.html";

const ASSETS_DIR: &str = "assets";

const STYLE_CSS: &str = r#"body {
  font-family: 'Helvetica Neue', Arial, sans-serif;
  line-height: 1.6;
  color: #333;
  margin: 0;
  background: #f5f6f8;
}
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
header { border-bottom: 1px solid #ddd; margin-bottom: 24px; display: flex; align-items: baseline; }
header h1 { font-size: 1.6em; margin: 0; }
header .updated { margin-left: auto; color: #777; font-size: 0.9em; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(480px, 1fr)); gap: 20px; }
.paper-card {
  background: #fff;
  border-radius: 6px;
  padding: 16px 20px;
  box-shadow: 0 2px 5px rgba(0,0,0,0.1);
  transition: all 0.3s ease;
}
.paper-card:hover { transform: translateY(-2px); box-shadow: 0 4px 10px rgba(0,0,0,0.15); }
.paper-title { color: #2c3e50; margin: 0 0 6px; font-size: 1.15em; }
.paper-meta { color: #777; font-size: 0.85em; margin: 0 0 10px; }
.summary-text { font-size: 1em; line-height: 1.8; color: #444; white-space: pre-wrap; }
.summary-text.placeholder { color: #999; font-style: italic; }
.actions { display: flex; gap: 8px; margin-top: 12px; }
.actions a, .actions button {
  font-size: 0.85em;
  padding: 4px 10px;
  border: 1px solid #0d6efd;
  border-radius: 4px;
  color: #0d6efd;
  background: #fff;
  text-decoration: none;
  cursor: pointer;
}
.actions button.copied { background: #d4edda; border-color: #28a745; color: #28a745; }
.empty { color: #777; }
"#;

const COPY_JS: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  function fallbackCopy(text) {
    const textarea = document.createElement('textarea');
    textarea.value = text;
    textarea.style.position = 'fixed';
    textarea.style.opacity = 0;
    document.body.appendChild(textarea);
    textarea.select();
    let ok = false;
    try {
      ok = document.execCommand('copy');
    } catch (err) {
      console.error('Copy failed:', err);
    }
    document.body.removeChild(textarea);
    return ok ? Promise.resolve() : Promise.reject(new Error('copy failed'));
  }

  function copyText(text) {
    if (navigator.clipboard && window.isSecureContext) {
      return navigator.clipboard.writeText(text).catch(function () {
        return fallbackCopy(text);
      });
    }
    return fallbackCopy(text);
  }

  document.querySelectorAll('.copy-btn').forEach(function (button) {
    button.addEventListener('click', function () {
      const target = document.getElementById(button.dataset.target);
      if (!target) {
        return;
      }
      copyText(target.textContent).then(function () {
        const label = button.textContent;
        button.classList.add('copied');
        button.textContent = 'Copied!';
        setTimeout(function () {
          button.classList.remove('copied');
          button.textContent = label;
        }, 1500);
      }, function (err) {
        console.error('Could not copy summary:', err);
      });
    });
  });
});
"#;

/// Page template, rendered with HTML auto-escaping
const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Template context for the whole page
#[derive(Debug, Serialize)]
struct PageContext<'a> {
    title: &'a str,
    assets: &'static str,
    updated: String,
    count: usize,
    cards: Vec<CardContext<'a>>,
}

/// Template context for one paper card
#[derive(Debug, Serialize)]
struct CardContext<'a> {
    idx: usize,
    id: &'a str,
    title: &'a str,
    authors: String,
    published: &'a str,
    summary: &'a str,
    placeholder: bool,
    source_url: &'a str,
    pdf_url: &'a str,
}

impl<'a> CardContext<'a> {
    fn new(idx: usize, item: &'a RenderItem) -> Self {
        let paper = &item.paper;
        Self {
            idx,
            id: &paper.id,
            title: &paper.title,
            authors: paper.authors.join(", "),
            published: paper.published_date(),
            summary: &item.summary.text,
            placeholder: item.summary.placeholder,
            source_url: &paper.source_url,
            pdf_url: &paper.pdf_url,
        }
    }
}

/// Renders a [`RenderModel`] as a static page.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    title: String,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new("arXiv Paper Digest")
    }
}

impl PageRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the HTML document. Output depends only on the inputs.
    pub fn render(&self, model: &RenderModel, generated_at: DateTime<Utc>) -> Result<String> {
        let mut env = Environment::new();
        env.add_template(INDEX_FILE, INDEX_TEMPLATE)?;

        let ctx = PageContext {
            title: &self.title,
            assets: ASSETS_DIR,
            updated: generated_at.format("%Y-%m-%d %H:%M").to_string(),
            count: model.len(),
            cards: model
                .items
                .iter()
                .enumerate()
                .map(|(idx, item)| CardContext::new(idx, item))
                .collect(),
        };

        let html = env.get_template(INDEX_FILE)?.render(&ctx)?;
        Ok(html)
    }

    /// Write the page and its assets into `dir`, creating it if needed.
    ///
    /// Returns the path of the written `index.html`.
    pub fn write_site(
        &self,
        dir: &Path,
        model: &RenderModel,
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let index = dir.join(INDEX_FILE);
        let html = self
            .render(model, generated_at)
            .map_err(|e| DigestError::output(&index, e))?;

        let assets = dir.join(ASSETS_DIR);
        std::fs::create_dir_all(&assets).map_err(|e| DigestError::output(&assets, e))?;

        write_file(&assets.join("style.css"), STYLE_CSS)?;
        write_file(&assets.join("copy.js"), COPY_JS)?;
        write_file(&index, &html)?;

        info!(path = %index.display(), papers = model.len(), "Page written");
        Ok(index)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| DigestError::output(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::fixtures::{fixed_time, paper};
    use crate::paper::SummaryEntry;
    use scraper::{Html, Selector};
    use tempfile::TempDir;

    fn model() -> RenderModel {
        let mut tricky = paper("P2");
        tricky.title = "Tags <b>&</b> \"quotes\"".to_string();
        RenderModel {
            items: vec![
                RenderItem {
                    paper: paper("P1"),
                    summary: SummaryEntry::new("P1", "A fun read.", fixed_time()),
                },
                RenderItem {
                    paper: tricky,
                    summary: SummaryEntry::placeholder("P2", fixed_time()),
                },
            ],
        }
    }

    fn select<'a>(doc: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
        match Selector::parse(css) {
            Ok(selector) => doc.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_render_is_deterministic() -> Result<()> {
        let renderer = PageRenderer::default();
        let a = renderer.render(&model(), fixed_time())?;
        let b = renderer.render(&model(), fixed_time())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_render_lists_every_entry_in_order() -> Result<()> {
        let html = PageRenderer::new("Digest").render(&model(), fixed_time())?;
        let doc = Html::parse_document(&html);

        let titles: Vec<String> = select(&doc, ".paper-title")
            .iter()
            .map(|e| e.text().collect())
            .collect();
        assert_eq!(titles, vec!["Paper P1", "Tags <b>&</b> \"quotes\""]);

        let summaries: Vec<String> = select(&doc, ".summary-text")
            .iter()
            .map(|e| e.text().collect())
            .collect();
        assert_eq!(summaries[0], "A fun read.");
        assert!(!summaries[1].is_empty());
        assert_eq!(select(&doc, ".summary-text.placeholder").len(), 1);

        let buttons = select(&doc, "button.copy-btn");
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[1].value().attr("data-target"), Some("summary-1"));

        let links: Vec<&str> = select(&doc, ".actions a")
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert!(links.contains(&"https://arxiv.org/abs/P1"));

        assert!(html.contains("Ada Lovelace, Alan Turing"));
        assert!(html.contains("Last updated: 2024-09-10 12:30 UTC"));
        Ok(())
    }

    #[test]
    fn test_render_escapes_paper_fields() -> Result<()> {
        let mut item = RenderItem {
            paper: paper("P1"),
            summary: SummaryEntry::new("P1", "<script>alert(1)</script> & more", fixed_time()),
        };
        item.paper.title = "Tags <b>&</b> \"quotes\"".to_string();
        item.paper.authors = vec!["O'Brien <ob@example.org>".to_string()];
        let model = RenderModel { items: vec![item] };

        let html = PageRenderer::new("A & B").render(&model, fixed_time())?;
        assert!(!html.contains("<b>&</b>"));
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("<ob@example.org>"));
        assert!(html.contains("Tags &lt;b&gt;&amp;"));
        assert!(html.contains("&quot;quotes&quot;"));
        assert!(html.contains("<title>A &amp; B</title>"));

        let doc = Html::parse_document(&html);
        let summary: String = select(&doc, ".summary-text")
            .iter()
            .flat_map(|e| e.text())
            .collect();
        assert_eq!(summary, "<script>alert(1)</script> & more");
        Ok(())
    }

    #[test]
    fn test_render_empty_model() -> Result<()> {
        let html = PageRenderer::default().render(&RenderModel::default(), fixed_time())?;
        assert!(html.contains("No papers found."));
        assert!(html.contains("0 papers"));
        assert!(!html.contains("paper-card"));
        Ok(())
    }

    #[test]
    fn test_write_site_creates_directory_and_assets() -> Result<()> {
        let dir = TempDir::new()?;
        let out = dir.path().join("site").join("nested");

        let index = PageRenderer::default().write_site(&out, &model(), fixed_time())?;
        assert_eq!(index, out.join(INDEX_FILE));
        assert!(out.join("assets/style.css").is_file());
        assert!(out.join("assets/copy.js").is_file());

        let html = std::fs::read_to_string(&index)?;
        assert!(html.contains("assets/copy.js"));
        assert!(!html.contains("https://cdn."));
        Ok(())
    }

    #[test]
    fn test_write_site_unwritable_is_output_error() -> Result<()> {
        let dir = TempDir::new()?;
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory")?;

        let err = PageRenderer::default()
            .write_site(&blocker.join("out"), &model(), fixed_time())
            .unwrap_err();
        assert!(matches!(err, DigestError::Output { .. }));
        assert!(err.is_fatal());
        Ok(())
    }
}
