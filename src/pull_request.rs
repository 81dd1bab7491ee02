//! `github_pull_request` documents: metadata, the unified diff with review
//! comments interleaved at their diff positions, then a repository snapshot.

use tracing::info;

use crate::envelope::{DocumentBuilder, SourceKind};
use crate::error::Result;
use crate::fetch::{fetch_all_pages, fetch_json, fetch_text, RemoteClient};
use crate::models::{ApiComment, ApiPullRequest, ReviewComment};
use crate::repository::{repository_snapshot, ItemRef, WalkLimits};

/// Stable sort by diff position; comments without one go last and keep
/// their relative order.
pub fn sort_comments(comments: &mut [ReviewComment]) {
    comments.sort_by_key(|c| (c.position.is_none(), c.position));
}

/// One piece of the `<diff_and_comments>` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffPiece<'a> {
    Line(&'a str),
    Comment(&'a ReviewComment),
}

/// Walk the diff and the position-sorted comments together. A comment with
/// `position == i` follows diff line `i`; comments with no position, or a
/// position past the last line, follow the final line.
pub fn interleave_diff<'a>(diff: &'a str, comments: &'a [ReviewComment]) -> Vec<DiffPiece<'a>> {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for (index, line) in diff.split('\n').enumerate() {
        pieces.push(DiffPiece::Line(line));
        while let Some(comment) = comments.get(cursor) {
            if comment.position != Some(index) {
                break;
            }
            pieces.push(DiffPiece::Comment(comment));
            cursor += 1;
        }
    }
    pieces.extend(comments[cursor..].iter().map(DiffPiece::Comment));
    pieces
}

fn merge_sentence(pr: &ApiPullRequest, owner: &str) -> String {
    format!(
        "{} wants to merge {} {} into {}:{} from {}",
        pr.user.login,
        pr.commits,
        if pr.commits == 1 { "commit" } else { "commits" },
        owner,
        pr.base.ref_name,
        pr.head.label
    )
}

fn write_review_comment(doc: &mut DocumentBuilder, comment: &ReviewComment) {
    doc.open("review_comment");
    doc.element("author", &comment.author);
    doc.element("content", &comment.content);
    if let Some(path) = &comment.path {
        doc.element("path", path);
    }
    if let Some(line) = comment.line {
        doc.element("line", &line.to_string());
    }
    doc.close();
}

/// Build the `github_pull_request` document for a PR URL.
pub fn process_pull_request(
    client: &dyn RemoteClient,
    api_base: &str,
    limits: WalkLimits,
    pr_url: &str,
) -> Result<String> {
    let item = ItemRef::parse(pr_url, "pull")?;
    let api_url = format!(
        "{}/repos/{}/{}/pulls/{}",
        api_base.trim_end_matches('/'),
        item.owner,
        item.name,
        item.number
    );

    let pr: ApiPullRequest = fetch_json(client, &api_url)?;
    let diff = fetch_text(client, &pr.diff_url)?;
    let general: Vec<ApiComment> = fetch_all_pages(client, &pr.comments_url)?;
    let review: Vec<ApiComment> = fetch_all_pages(client, &pr.review_comments_url)?;

    let mut comments: Vec<ReviewComment> = general
        .into_iter()
        .chain(review)
        .map(ReviewComment::from)
        .collect();
    sort_comments(&mut comments);

    let mut doc = DocumentBuilder::source(SourceKind::GitHubPullRequest, pr_url);
    doc.open("pull_request_info");
    doc.element("title", &pr.title);
    doc.element("description", pr.body.as_deref().unwrap_or_default());
    doc.open("merge_details");
    doc.text(&merge_sentence(&pr, &item.owner));
    doc.close();

    doc.open("diff_and_comments");
    for piece in interleave_diff(&diff, &comments) {
        match piece {
            DiffPiece::Line(line) => {
                doc.text(line);
            }
            DiffPiece::Comment(comment) => write_review_comment(&mut doc, comment),
        }
    }
    doc.close();
    doc.close();

    let snapshot = repository_snapshot(client, api_base, limits, &item.owner, &item.name)?;
    doc.open("repository");
    doc.fragment(snapshot);
    doc.close();

    info!(number = %item.number, comments = comments.len(), "Pull request and repository content processed");
    Ok(doc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(author: &str, position: Option<usize>) -> ReviewComment {
        ReviewComment {
            author: author.to_string(),
            content: format!("from {}", author),
            path: position.map(|_| "src/lib.rs".to_string()),
            line: position.map(|p| p as u64 + 10),
            position,
        }
    }

    fn authors(comments: &[ReviewComment]) -> Vec<&str> {
        comments.iter().map(|c| c.author.as_str()).collect()
    }

    #[test]
    fn unpositioned_comments_sort_last_and_stay_stable() {
        let mut comments = vec![
            comment("general-1", None),
            comment("at-4", Some(4)),
            comment("general-2", None),
            comment("at-1", Some(1)),
            comment("at-1-later", Some(1)),
        ];
        sort_comments(&mut comments);
        assert_eq!(
            authors(&comments),
            vec!["at-1", "at-1-later", "at-4", "general-1", "general-2"]
        );
    }

    #[test]
    fn comments_follow_their_diff_line() {
        let diff = "l0\nl1\nl2\nl3\nl4";
        let mut comments = vec![comment("a", Some(4)), comment("b", Some(1)), comment("c", None)];
        sort_comments(&mut comments);

        let rendered: Vec<String> = interleave_diff(diff, &comments)
            .into_iter()
            .map(|p| match p {
                DiffPiece::Line(l) => l.to_string(),
                DiffPiece::Comment(c) => format!("<{}>", c.author),
            })
            .collect();
        assert_eq!(
            rendered,
            vec!["l0", "l1", "<b>", "l2", "l3", "l4", "<a>", "<c>"]
        );
    }

    #[test]
    fn out_of_range_position_is_kept() {
        let comments = vec![comment("far", Some(99))];
        let pieces = interleave_diff("only", &comments);
        assert_eq!(pieces.len(), 2);
        assert!(matches!(&pieces[1], DiffPiece::Comment(c) if c.author == "far"));
    }

    #[test]
    fn general_comment_omits_path_and_line() {
        let mut doc = DocumentBuilder::source(SourceKind::GitHubPullRequest, "u");
        write_review_comment(&mut doc, &comment("g", None));
        write_review_comment(&mut doc, &comment("r", Some(2)));
        let out = doc.finish();
        assert!(out.contains("<review_comment>\n<author>g</author>\n<content>from g</content>\n</review_comment>"));
        assert!(out.contains("<path>src/lib.rs</path>\n<line>12</line>"));
    }
}
