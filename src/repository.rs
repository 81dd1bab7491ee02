//! GitHub repository walker and `github_repository` documents.
//!
//! The walker visits the contents API depth-first, pre-order, in the order
//! each listing returns its entries, using an explicit stack of listing
//! iterators. [`WalkLimits`] bounds depth and the number of files fetched.
//!
//! Failure rules:
//! - a failed listing call (top-level or nested) aborts the walk
//! - a failed file download or notebook conversion aborts the walk unless
//!   `skip_failed_files` is set, in which case the file is logged and skipped
//! - entries that are neither files nor directories are skipped

use tracing::{debug, info, warn};
use url::Url;

use crate::config::WalkConfig;
use crate::envelope::{DocumentBuilder, SourceKind};
use crate::error::{IngestError, Result};
use crate::fetch::{fetch_json, read_remote_file, RemoteClient};
use crate::filetype::{convert_notebook, is_allowed_filetype, is_notebook};
use crate::models::{ContentEntry, EntryKind, FileEntry, Listing};

/// Bounds applied to one remote walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkLimits {
    /// Directories deeper than this (top-level listing is depth 0) are skipped.
    pub max_depth: Option<usize>,
    /// Stop fetching once this many files have been collected.
    pub max_files: Option<usize>,
    pub skip_failed_files: bool,
}

impl From<&WalkConfig> for WalkLimits {
    fn from(cfg: &WalkConfig) -> Self {
        Self {
            max_depth: cfg.max_depth,
            max_files: cfg.max_files,
            skip_failed_files: cfg.skip_failed_files,
        }
    }
}

/// Owner, name and optional ref/subdirectory parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub git_ref: Option<String>,
    pub subdir: Option<String>,
}

impl RepositoryRef {
    /// Parse `https://github.com/<owner>/<repo>[.git][/tree/<ref>[/<subdir>...]]`.
    pub fn parse(repo_url: &str) -> Result<Self> {
        let parsed = Url::parse(repo_url)
            .map_err(|_| IngestError::UnsupportedSource(repo_url.to_string()))?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(IngestError::UnsupportedSource(repo_url.to_string()));
        }

        let owner = segments[0].to_string();
        let name = segments[1].trim_end_matches(".git").to_string();

        let (git_ref, subdir) = if segments.get(2) == Some(&"tree") {
            let git_ref = segments.get(3).map(|r| r.to_string());
            let subdir = if segments.len() > 4 {
                Some(segments[4..].join("/"))
            } else {
                None
            };
            (git_ref, subdir)
        } else {
            (None, None)
        };

        Ok(Self {
            owner,
            name,
            git_ref,
            subdir,
        })
    }

    /// Same repository at its default branch, without subdirectory.
    pub fn root(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            git_ref: None,
            subdir: None,
        }
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

/// A numbered PR or issue inside a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub owner: String,
    pub name: String,
    pub number: String,
}

impl ItemRef {
    /// Parse `https://github.com/<owner>/<repo>/<marker>/<number>[/...]`,
    /// where `marker` is `pull` or `issues`.
    pub fn parse(item_url: &str, marker: &str) -> Result<Self> {
        let unsupported = || IngestError::UnsupportedSource(item_url.to_string());
        let parsed = Url::parse(item_url).map_err(|_| unsupported())?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        let at = segments
            .iter()
            .position(|s| *s == marker)
            .filter(|&i| i >= 2)
            .ok_or_else(unsupported)?;
        let number = segments.get(at + 1).ok_or_else(unsupported)?;
        Ok(Self {
            owner: segments[0].to_string(),
            name: segments[1].to_string(),
            number: number.to_string(),
        })
    }
}

/// Contents API URL for a repository reference.
pub fn repository_listing_url(api_base: &str, repo: &RepositoryRef) -> String {
    let mut url = format!(
        "{}/repos/{}/{}/contents",
        api_base.trim_end_matches('/'),
        repo.owner,
        repo.name
    );
    if let Some(subdir) = &repo.subdir {
        url.push('/');
        url.push_str(subdir);
    }
    if let Some(git_ref) = &repo.git_ref {
        url.push_str("?ref=");
        url.push_str(git_ref);
    }
    url
}

pub struct RepositoryWalker<'a> {
    client: &'a dyn RemoteClient,
    limits: WalkLimits,
}

impl<'a> RepositoryWalker<'a> {
    pub fn new(client: &'a dyn RemoteClient, limits: WalkLimits) -> Self {
        Self { client, limits }
    }

    /// Collect every eligible file reachable from `listing_url`.
    pub fn walk(&self, listing_url: &str) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        let top = self.list(listing_url)?;
        let mut stack = vec![(top.into_iter(), 0usize)];

        while let Some((entries, depth)) = stack.last_mut() {
            let depth = *depth;
            let Some(entry) = entries.next() else {
                stack.pop();
                continue;
            };

            match entry.kind {
                EntryKind::File => {
                    if !is_allowed_filetype(&entry.name) {
                        debug!(path = %entry.path, "Skipping file type");
                        continue;
                    }
                    if let Some(max) = self.limits.max_files {
                        if files.len() >= max {
                            warn!(max, "File limit reached, remaining entries skipped");
                            break;
                        }
                    }
                    if let Some(file) = self.fetch_file(&entry)? {
                        files.push(file);
                    }
                }
                EntryKind::Dir => {
                    if self.limits.max_depth.is_some_and(|max| depth + 1 > max) {
                        warn!(path = %entry.path, depth = depth + 1, "Directory exceeds max depth, skipped");
                        continue;
                    }
                    let children = self.list(&entry.url)?;
                    stack.push((children.into_iter(), depth + 1));
                }
                _ => debug!(path = %entry.path, kind = ?entry.kind, "Skipped"),
            }
        }

        info!(count = files.len(), "All files processed");
        Ok(files)
    }

    fn list(&self, url: &str) -> Result<Vec<ContentEntry>> {
        let listing: Listing = fetch_json(self.client, url)?;
        Ok(listing.into_entries())
    }

    fn fetch_file(&self, entry: &ContentEntry) -> Result<Option<FileEntry>> {
        let Some(download_url) = entry.download_url.as_deref() else {
            warn!(path = %entry.path, "File has no download URL, skipped");
            return Ok(None);
        };
        info!(path = %entry.path, "Processing");

        let outcome = read_remote_file(self.client, download_url).and_then(|raw| {
            if is_notebook(&entry.name) {
                convert_notebook(&entry.path, &raw)
            } else {
                Ok(raw)
            }
        });

        match outcome {
            Ok(content) => Ok(Some(FileEntry {
                path: entry.path.clone(),
                content,
            })),
            Err(e) if self.limits.skip_failed_files => {
                warn!(path = %entry.path, error = %e, "File failed, skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Render walked files as a `github_repository` document.
pub fn render_repository(identity: &str, files: &[FileEntry]) -> String {
    let mut doc = DocumentBuilder::source(SourceKind::GitHubRepository, identity);
    for file in files {
        doc.file(&file.path, &file.content);
    }
    doc.finish()
}

/// Build the `github_repository` document for a repository URL.
pub fn process_repository(
    client: &dyn RemoteClient,
    api_base: &str,
    limits: WalkLimits,
    repo_url: &str,
) -> Result<String> {
    let repo = RepositoryRef::parse(repo_url)?;
    let listing_url = repository_listing_url(api_base, &repo);
    info!(url = %repo_url, listing = %listing_url, "Walking repository");
    let files = RepositoryWalker::new(client, limits).walk(&listing_url)?;
    Ok(render_repository(repo_url, &files))
}

/// Snapshot of a repository's default branch, appended to PR and issue
/// documents inside `<repository>`.
pub fn repository_snapshot(
    client: &dyn RemoteClient,
    api_base: &str,
    limits: WalkLimits,
    owner: &str,
    name: &str,
) -> Result<String> {
    let repo = RepositoryRef::root(owner, name);
    process_repository(client, api_base, limits, &repo.html_url())
}
