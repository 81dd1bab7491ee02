//! Input classification: which source a locator names.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::envelope::SourceKind;
use crate::error::{IngestError, Result};

/// A classified input locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    GitHubRepository(String),
    GitHubPullRequest(String),
    GitHubIssue(String),
    ArxivPaper(String),
    YouTubeVideo(String),
    /// A DOI or PubMed id resolved through Sci-Hub.
    PaperIdentifier(String),
    LocalDirectory(PathBuf),
}

impl SourceLocator {
    /// Classify `input`. Order matters: GitHub URLs first, then other web
    /// URLs, then bare paper identifiers, then existing local directories.
    /// A scheme-less `github.com/...` locator is read as `https://`.
    pub fn classify(input: &str) -> Result<Self> {
        let input = input.trim();
        let with_scheme;
        let input = if input.starts_with("github.com/") || input.starts_with("www.github.com/") {
            with_scheme = format!("https://{}", input);
            with_scheme.as_str()
        } else {
            input
        };
        let unsupported = || IngestError::UnsupportedSource(input.to_string());

        if input.starts_with("http://") || input.starts_with("https://") {
            let url = Url::parse(input).map_err(|_| unsupported())?;
            let host = url.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let owned = input.to_string();
            return match host {
                "github.com" => {
                    let segments: Vec<&str> = url
                        .path_segments()
                        .map(|s| s.filter(|p| !p.is_empty()).collect())
                        .unwrap_or_default();
                    match segments.get(2) {
                        Some(&"pull") => Ok(Self::GitHubPullRequest(owned)),
                        Some(&"issues") => Ok(Self::GitHubIssue(owned)),
                        _ if segments.len() >= 2 => Ok(Self::GitHubRepository(owned)),
                        _ => Err(unsupported()),
                    }
                }
                "youtube.com" | "m.youtube.com" | "youtu.be" => Ok(Self::YouTubeVideo(owned)),
                "arxiv.org" => Ok(Self::ArxivPaper(owned)),
                _ => Err(unsupported()),
            };
        }

        if is_paper_identifier(input) {
            return Ok(Self::PaperIdentifier(input.to_string()));
        }

        let path = Path::new(input);
        if path.is_dir() {
            return Ok(Self::LocalDirectory(path.to_path_buf()));
        }

        Err(unsupported())
    }

    /// Source kind of the document this locator produces.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::GitHubRepository(_) => SourceKind::GitHubRepository,
            Self::GitHubPullRequest(_) => SourceKind::GitHubPullRequest,
            Self::GitHubIssue(_) => SourceKind::GitHubIssue,
            Self::ArxivPaper(_) => SourceKind::ArxivPaper,
            Self::YouTubeVideo(_) => SourceKind::YouTubeTranscript,
            Self::PaperIdentifier(_) => SourceKind::SciHubPaper,
            Self::LocalDirectory(_) => SourceKind::LocalDirectory,
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalDirectory(path) => write!(f, "{}", path.display()),
            Self::GitHubRepository(s)
            | Self::GitHubPullRequest(s)
            | Self::GitHubIssue(s)
            | Self::ArxivPaper(s)
            | Self::YouTubeVideo(s)
            | Self::PaperIdentifier(s) => f.write_str(s),
        }
    }
}

/// `10.<registrant>/<suffix>` DOIs and all-digit PubMed ids.
pub fn is_paper_identifier(input: &str) -> bool {
    let is_doi = input.starts_with("10.") && input.contains('/') && !input.contains(char::is_whitespace);
    let is_pmid = !input.is_empty() && input.chars().all(|c| c.is_ascii_digit());
    is_doi || is_pmid
}
