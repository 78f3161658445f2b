//! File-format parsers for corpus ingestion.
//!
//! PDF extraction runs through an ordered chain of independent parsers:
//! the in-process `pdf-extract` crate first, then the `pdftotext` system
//! binary. The first parser that yields text wins, and a failed attempt
//! never affects the next one.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use std::path::Path;
use std::process::Command;

type PdfParser = fn(&Path) -> Result<String>;

/// Parsers tried in order; first success wins.
const PDF_PARSERS: &[(&str, PdfParser)] = &[
    ("pdf-extract", parse_pdf_extract),
    ("pdftotext", parse_pdftotext),
];

/// Extract text from a PDF through the parser chain.
pub(crate) fn parse_pdf(path: &Path) -> Result<String> {
    let mut last_error = None;
    for (name, parser) in PDF_PARSERS {
        match parser(path) {
            Ok(text) => return Ok(text),
            Err(error) => {
                tracing::warn!("PDF parser {name} failed on {}: {error}", path.display());
                last_error = Some(error);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("no PDF parser available")))
}

fn parse_pdf_extract(path: &Path) -> Result<String> {
    let text = pdf_extract::extract_text(path).map_err(|e| anyhow!("{e}"))?;
    if text.trim().is_empty() {
        return Err(anyhow!("no text extracted"));
    }
    Ok(text)
}

fn parse_pdftotext(path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| anyhow!("failed to run pdftotext: {e} (is poppler installed?)"))?;

    if !output.status.success() {
        return Err(anyhow!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    if text.trim().is_empty() {
        return Err(anyhow!("pdftotext produced no text output"));
    }
    Ok(text)
}

/// Extract the visible text of an HTML document. Parsing is error-tolerant
/// and never fails; markup without a `<body>` falls back to the document
/// root.
pub(crate) fn parse_html(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let body = Selector::parse("body").expect("static selector");

    let mut pieces: Vec<&str> = Vec::new();
    for element in document.select(&body) {
        pieces.extend(element.text().map(str::trim).filter(|t| !t.is_empty()));
    }
    if pieces.is_empty() {
        pieces.extend(
            document
                .root_element()
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        );
    }

    pieces.join("\n")
}
