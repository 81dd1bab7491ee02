//! Core data models used throughout corpus-forge.
//!
//! Two families live here: the domain values the assemblers produce
//! ([`FileEntry`], [`ReviewComment`], [`IssueComment`], [`CodeSnippet`]) and
//! the GitHub REST payload shapes they are decoded from. Payload structs
//! only name the fields we read; serde ignores the rest.

use serde::Deserialize;

/// One eligible file discovered by a walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Remote-relative (API `path`) or local-relative path.
    pub path: String,
    /// Raw text, or the exported script for notebooks.
    pub content: String,
}

/// A PR comment, either general or attached to a diff position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub author: String,
    pub content: String,
    pub path: Option<String>,
    pub line: Option<u64>,
    /// Index into the unified diff; `None` for general PR comments.
    pub position: Option<usize>,
}

/// A comment on an issue thread with its resolved code references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub author: String,
    pub content: String,
    pub snippets: Vec<CodeSnippet>,
}

/// Lines cut from a file referenced by a `#L<start>-L<end>` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnippet {
    pub url: String,
    pub start: usize,
    pub end: usize,
    pub code: String,
}

// ============ GitHub REST payloads ============

/// Entry type reported by the contents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One item of a contents API directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub download_url: Option<String>,
    pub url: String,
}

/// The contents API answers with an array for directories and a single
/// object when the path names a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing {
    Directory(Vec<ContentEntry>),
    Single(ContentEntry),
}

impl Listing {
    pub fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            Listing::Directory(entries) => entries,
            Listing::Single(entry) => vec![entry],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGitRef {
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPullRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: ApiUser,
    #[serde(default)]
    pub commits: u64,
    pub base: ApiGitRef,
    pub head: ApiGitRef,
    pub diff_url: String,
    pub comments_url: String,
    pub review_comments_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssue {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub comments_url: String,
}

/// Shared shape of issue comments and PR review comments.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    pub user: ApiUser,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub original_line: Option<u64>,
}

impl From<ApiComment> for ReviewComment {
    fn from(c: ApiComment) -> Self {
        ReviewComment {
            author: c.user.login,
            content: c.body.unwrap_or_default(),
            path: c.path,
            line: c.original_line,
            position: c.position,
        }
    }
}
