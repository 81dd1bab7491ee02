//! Ingestion orchestration.
//!
//! Coordinates one run: classify → build document → normalize → persist.
//! Artifacts are written only after the document has been built in full,
//! so a failed build leaves no partial output behind.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, Credentials};
use crate::envelope::SourceKind;
use crate::error::IngestError;
use crate::fetch::{HttpClient, RemoteClient};
use crate::issue::process_issue;
use crate::links::extract_links;
use crate::local_folder::process_local_folder;
use crate::locator::SourceLocator;
use crate::normalize::normalize;
use crate::paper::{process_arxiv, process_scihub};
use crate::pull_request::process_pull_request;
use crate::repository::{process_repository, WalkLimits};
use crate::tokens::TokenReport;
use crate::transcript::process_transcript;

/// Remote clients and settings shared by every assembler in a run.
pub struct IngestContext<'a> {
    /// Authenticated client for the GitHub API and raw content.
    pub github: &'a dyn RemoteClient,
    /// Plain client for paper hosts and transcript endpoints.
    pub web: &'a dyn RemoteClient,
    pub config: &'a Config,
}

impl IngestContext<'_> {
    fn limits(&self) -> WalkLimits {
        WalkLimits::from(&self.config.walk)
    }
}

/// The two HTTP clients a real run needs.
pub struct HttpClients {
    pub github: HttpClient,
    pub web: HttpClient,
}

impl HttpClients {
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        if credentials.github_token().is_none() {
            warn!(
                var = %config.github.token_env,
                "No GitHub token set; only public repositories are reachable and rate limits are low"
            );
        }
        let github = HttpClient::github(
            &config.github.user_agent,
            credentials,
            config.github.timeout(),
            config.github.max_retries,
        )
        .context("Failed to build GitHub client")?;
        let web = HttpClient::web(
            &config.papers.user_agent,
            Some(Duration::from_secs(config.papers.timeout_secs)),
            config.github.max_retries,
        )
        .context("Failed to build web client")?;
        Ok(Self { github, web })
    }

    pub fn context<'a>(&'a self, config: &'a Config) -> IngestContext<'a> {
        IngestContext {
            github: &self.github,
            web: &self.web,
            config,
        }
    }
}

/// Build the interchange document for one locator.
pub fn build_document(locator: &SourceLocator, ctx: &IngestContext<'_>) -> Result<String, IngestError> {
    let api_base = ctx.config.github.api_base.as_str();
    match locator {
        SourceLocator::GitHubRepository(url) => {
            process_repository(ctx.github, api_base, ctx.limits(), url)
        }
        SourceLocator::GitHubPullRequest(url) => {
            process_pull_request(ctx.github, api_base, ctx.limits(), url)
        }
        SourceLocator::GitHubIssue(url) => process_issue(ctx.github, api_base, ctx.limits(), url),
        SourceLocator::ArxivPaper(url) => process_arxiv(ctx.web, url),
        SourceLocator::PaperIdentifier(id) => {
            Ok(process_scihub(ctx.web, &ctx.config.papers.scihub_base, id))
        }
        SourceLocator::YouTubeVideo(url) => Ok(process_transcript(
            ctx.web,
            &ctx.config.transcript.timedtext_base,
            &ctx.config.transcript.lang,
            url,
        )),
        SourceLocator::LocalDirectory(path) => process_local_folder(path, &ctx.config.local),
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub kind: SourceKind,
    pub raw_path: PathBuf,
    pub compressed_path: PathBuf,
    /// Set when the URL list was written, with the number of URLs.
    pub urls: Option<(PathBuf, usize)>,
    pub tokens: TokenReport,
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ingest {}", self.kind)?;
        writeln!(f, "  uncompressed: {}", self.raw_path.display())?;
        writeln!(f, "  compressed:   {}", self.compressed_path.display())?;
        if let Some((path, count)) = &self.urls {
            writeln!(f, "  urls:         {} ({} found)", path.display(), count)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.tokens)?;
        write!(f, "ok")
    }
}

/// Build, normalize and persist the artifacts for `locator`.
pub fn run_ingest(locator: &SourceLocator, ctx: &IngestContext<'_>) -> Result<IngestReport> {
    info!(locator = %locator, kind = %locator.kind(), "Building document");
    let raw = build_document(locator, ctx)
        .with_context(|| format!("Failed to build document for {}", locator))?;

    let normalized = normalize(&raw);
    let tokens = TokenReport::new(&raw, &normalized);

    let output = &ctx.config.output;
    std::fs::create_dir_all(&output.dir)
        .with_context(|| format!("Failed to create output directory: {}", output.dir.display()))?;

    let raw_path = output.raw_path();
    std::fs::write(&raw_path, &raw)
        .with_context(|| format!("Failed to write {}", raw_path.display()))?;

    let compressed_path = output.compressed_path();
    std::fs::write(&compressed_path, &normalized.text)
        .with_context(|| format!("Failed to write {}", compressed_path.display()))?;

    let urls = if output.write_urls {
        let links = extract_links(&raw);
        let urls_path = output.urls_path();
        let mut body = links.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        std::fs::write(&urls_path, body)
            .with_context(|| format!("Failed to write {}", urls_path.display()))?;
        Some((urls_path, links.len()))
    } else {
        None
    };

    info!(
        raw = %raw_path.display(),
        compressed = %compressed_path.display(),
        structured = normalized.is_structured(),
        "Artifacts written"
    );

    Ok(IngestReport {
        kind: locator.kind(),
        raw_path,
        compressed_path,
        urls,
        tokens,
    })
}
