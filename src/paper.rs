//! `arxiv_paper` and `sci_hub_paper` documents.
//!
//! Both download a PDF into a transient file and extract its text. An arXiv
//! failure aborts the build; a Sci-Hub failure becomes an `<error>` child.

use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::envelope::{error_source, DocumentBuilder, SourceKind};
use crate::error::{IngestError, Result};
use crate::fetch::{download_to_temp, RemoteClient};

/// Viewer suffix Sci-Hub appends to embedded PDF links.
const VIEWER_FRAGMENT: &str = "#navpanes=0&view=FitH";

/// Paths Sci-Hub serves from its own host.
const LOCAL_PREFIXES: &[&str] = &["/downloads", "/tree", "/uptodate"];

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))
}

/// Download `url` to a transient file and extract its text. The file is
/// removed when this returns, whether extraction worked or not.
pub fn download_pdf_text(client: &dyn RemoteClient, url: &str) -> Result<String> {
    let file = download_to_temp(client, url)?;
    let bytes = std::fs::read(file.path())?;
    extract_pdf_text(&bytes)
}

fn paper_document(kind: SourceKind, identity: &str, text: &str) -> String {
    let mut doc = DocumentBuilder::source(kind, identity);
    doc.open("paper");
    doc.text(text);
    doc.finish()
}

/// `https://arxiv.org/abs/<id>` to `https://arxiv.org/pdf/<id>.pdf`.
pub fn arxiv_pdf_url(abs_url: &str) -> String {
    let url = abs_url.trim_end_matches('/').replacen("/abs/", "/pdf/", 1);
    if url.ends_with(".pdf") {
        url
    } else {
        format!("{}.pdf", url)
    }
}

pub fn process_arxiv(client: &dyn RemoteClient, abs_url: &str) -> Result<String> {
    let pdf_url = arxiv_pdf_url(abs_url);
    info!(url = %pdf_url, "Downloading arXiv paper");
    let text = download_pdf_text(client, &pdf_url)?;
    info!(url = %abs_url, "ArXiv paper processed");
    Ok(paper_document(SourceKind::ArxivPaper, abs_url, &text))
}

/// Locate the embedded PDF in a Sci-Hub result page and make its link
/// absolute.
pub fn scihub_pdf_url(html: &str, scihub_base: &str, identifier: &str) -> Result<String> {
    let not_found = |reason: &str| IngestError::IdentifierResolution {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };
    let selector = Selector::parse("#pdf").map_err(|e| not_found(&e.to_string()))?;
    let document = Html::parse_document(html);
    let src = document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("src"))
        .ok_or_else(|| {
            not_found("Sci-hub might be inaccessible or the document is not available")
        })?;

    let path = src.replace(VIEWER_FRAGMENT, "").replace("//", "/");
    if LOCAL_PREFIXES.iter().any(|p| path.starts_with(p)) {
        Ok(format!("{}{}", scihub_base.trim_end_matches('/'), path))
    } else {
        Ok(format!("https:/{}", path))
    }
}

fn fetch_scihub_text(client: &dyn RemoteClient, scihub_base: &str, identifier: &str) -> Result<String> {
    let endpoint = format!("{}/", scihub_base.trim_end_matches('/'));
    let page = client
        .post_form(
            &endpoint,
            &[("sci-hub-plugin-check", ""), ("request", identifier)],
        )?
        .error_for_status()?;
    let pdf_url = scihub_pdf_url(&page.text(), scihub_base, identifier)?;
    info!(identifier, url = %pdf_url, "Downloading paper");
    download_pdf_text(client, &pdf_url)
}

/// Build the `sci_hub_paper` document for a DOI or PMID. Never fails: any
/// problem is reported inside the document.
pub fn process_scihub(client: &dyn RemoteClient, scihub_base: &str, identifier: &str) -> String {
    match fetch_scihub_text(client, scihub_base, identifier) {
        Ok(text) => {
            info!(identifier, "Identifier processed");
            paper_document(SourceKind::SciHubPaper, identifier, &text)
        }
        Err(e) => {
            warn!(identifier, error = %e, "Sci-Hub lookup failed");
            error_source(SourceKind::SciHubPaper, identifier, &e.to_string())
        }
    }
}
