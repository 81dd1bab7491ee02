//! `github_issue` documents: the issue thread with referenced code resolved
//! into snippets, then a repository snapshot.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::envelope::{DocumentBuilder, SourceKind};
use crate::error::{IngestError, Result};
use crate::fetch::{fetch_all_pages, fetch_json, fetch_text, RemoteClient};
use crate::models::{ApiComment, ApiIssue, CodeSnippet, IssueComment};
use crate::repository::{repository_snapshot, ItemRef, WalkLimits};

static SNIPPET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[^\s#)]+/blob/[^\s#)]+#L(\d+)-L(\d+)").unwrap()
});

/// A `.../blob/...#L<start>-L<end>` reference found in a comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetLink {
    /// The link as written, fragment included.
    pub url: String,
    /// The `/raw/` variant of the file URL, without fragment.
    pub raw_url: String,
    pub start: usize,
    pub end: usize,
}

/// Every line-range link in `body`, in order of appearance.
pub fn find_snippet_links(body: &str) -> Vec<SnippetLink> {
    SNIPPET_LINK
        .captures_iter(body)
        .filter_map(|caps| {
            let url = caps.get(0)?.as_str();
            let file_url = url.split('#').next()?;
            Some(SnippetLink {
                url: url.to_string(),
                raw_url: file_url.replacen("/blob/", "/raw/", 1),
                start: caps.get(1)?.as_str().parse().ok()?,
                end: caps.get(2)?.as_str().parse().ok()?,
            })
        })
        .collect()
}

/// Lines `start..=end` (1-based) of `content`, clamped to the file.
fn slice_lines(content: &str, start: usize, end: usize) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    if start == 0 || start > end || start > lines.len() {
        return None;
    }
    Some(lines[start - 1..end.min(lines.len())].join("\n"))
}

/// Fetch the raw file behind `link` and cut out the referenced lines.
pub fn resolve_snippet(client: &dyn RemoteClient, link: &SnippetLink) -> Result<CodeSnippet> {
    let failed = |reason: String| IngestError::SnippetResolution {
        url: link.url.clone(),
        reason,
    };
    let content = fetch_text(client, &link.raw_url).map_err(|e| failed(e.to_string()))?;
    let code = slice_lines(&content, link.start, link.end).ok_or_else(|| {
        failed(format!(
            "lines {}-{} outside a {}-line file",
            link.start,
            link.end,
            content.split('\n').count()
        ))
    })?;
    Ok(CodeSnippet {
        url: link.url.clone(),
        start: link.start,
        end: link.end,
        code,
    })
}

/// Resolve the snippets of one comment; unresolvable ones are logged and
/// left out.
pub fn collect_issue_comment(client: &dyn RemoteClient, comment: ApiComment) -> IssueComment {
    let content = comment.body.unwrap_or_default();
    let snippets = find_snippet_links(&content)
        .iter()
        .filter_map(|link| match resolve_snippet(client, link) {
            Ok(snippet) => Some(snippet),
            Err(e) => {
                warn!(error = %e, "Skipping code snippet");
                None
            }
        })
        .collect();
    IssueComment {
        author: comment.user.login,
        content,
        snippets,
    }
}

/// Build the `github_issue` document for an issue URL.
pub fn process_issue(
    client: &dyn RemoteClient,
    api_base: &str,
    limits: WalkLimits,
    issue_url: &str,
) -> Result<String> {
    let item = ItemRef::parse(issue_url, "issues")?;
    let api_url = format!(
        "{}/repos/{}/{}/issues/{}",
        api_base.trim_end_matches('/'),
        item.owner,
        item.name,
        item.number
    );

    let issue: ApiIssue = fetch_json(client, &api_url)?;
    let thread: Vec<ApiComment> = fetch_all_pages(client, &issue.comments_url)?;
    let comments: Vec<IssueComment> = thread
        .into_iter()
        .map(|c| collect_issue_comment(client, c))
        .collect();

    let mut doc = DocumentBuilder::source(SourceKind::GitHubIssue, issue_url);
    doc.open("issue_info");
    doc.element("title", &issue.title);
    doc.element("description", issue.body.as_deref().unwrap_or_default());
    doc.open("comments");
    for comment in &comments {
        doc.open("comment");
        doc.element("author", &comment.author);
        doc.element("content", &comment.content);
        for snippet in &comment.snippets {
            doc.open("code_snippet");
            doc.cdata(&snippet.code);
            doc.close();
        }
        doc.close();
    }
    doc.close();
    doc.close();

    let snapshot = repository_snapshot(client, api_base, limits, &item.owner, &item.name)?;
    doc.open("repository");
    doc.fragment(snapshot);
    doc.close();

    info!(number = %item.number, comments = comments.len(), "Issue and repository content processed");
    Ok(doc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryClient;

    #[test]
    fn finds_every_line_range_link() {
        let body = "See https://github.com/o/r/blob/main/f.py#L10-L12 and \
                    (https://github.com/o/r/blob/dev/src/g.rs#L1-L2). \
                    Not this: https://github.com/o/r/blob/main/h.py#L5";
        let links = find_snippet_links(body);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].raw_url, "https://github.com/o/r/raw/main/f.py");
        assert_eq!((links[0].start, links[0].end), (10, 12));
        assert_eq!(links[1].url, "https://github.com/o/r/blob/dev/src/g.rs#L1-L2");
    }

    #[test]
    fn slices_inclusive_range() {
        let content = (1..=5).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        assert_eq!(slice_lines(&content, 2, 3).as_deref(), Some("line 2\nline 3"));
        assert_eq!(slice_lines(&content, 4, 99).as_deref(), Some("line 4\nline 5"));
        assert_eq!(slice_lines(&content, 0, 2), None);
        assert_eq!(slice_lines(&content, 3, 2), None);
        assert_eq!(slice_lines(&content, 9, 10), None);
    }

    #[test]
    fn unresolvable_snippet_is_dropped_not_fatal() {
        let client = MemoryClient::new().with_text("https://github.com/o/r/raw/main/ok.py", "a\nb\nc");
        let comment: ApiComment = serde_json::from_value(serde_json::json!({
            "user": {"login": "octocat"},
            "body": "https://github.com/o/r/blob/main/gone.py#L1-L2 vs https://github.com/o/r/blob/main/ok.py#L2-L3"
        }))
        .unwrap();
        let collected = collect_issue_comment(&client, comment);
        assert_eq!(collected.author, "octocat");
        assert_eq!(collected.snippets.len(), 1);
        assert_eq!(collected.snippets[0].code, "b\nc");
    }
}
