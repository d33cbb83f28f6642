//! CSV export of the rendered papers.

use crate::error::{DigestError, Result};
use crate::paper::RenderModel;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One CSV row per paper
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    title: &'a str,
    authors: String,
    published: &'a str,
    source_url: &'a str,
    summary: &'a str,
    generated_at: String,
    placeholder: bool,
}

/// Write the model to `path`, one row per paper in page order.
pub fn write_csv(path: &Path, model: &RenderModel) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DigestError::output(parent, e))?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DigestError::output(path, e))?;

    for item in &model.items {
        wtr.serialize(ExportRow {
            id: &item.paper.id,
            title: &item.paper.title,
            authors: item.paper.authors.join("; "),
            published: item.paper.published_date(),
            source_url: &item.paper.source_url,
            summary: &item.summary.text,
            generated_at: item.summary.generated_at.to_rfc3339(),
            placeholder: item.summary.placeholder,
        })
        .map_err(|e| DigestError::output(path, e))?;
    }

    wtr.flush().map_err(|e| DigestError::output(path, e))?;
    info!(path = %path.display(), rows = model.len(), "CSV exported");
    Ok(())
}
