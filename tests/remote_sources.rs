//! End-to-end assembly of remote sources over the in-memory client.

use corpus_forge::fetch::MemoryClient;
use corpus_forge::issue::process_issue;
use corpus_forge::normalize::{check_well_formed, normalize};
use corpus_forge::paper::{process_arxiv, process_scihub};
use corpus_forge::pull_request::process_pull_request;
use corpus_forge::repository::{process_repository, RepositoryWalker, WalkLimits};
use corpus_forge::transcript::process_transcript;
use serde_json::{json, Value};

const API: &str = "https://api.github.com";
const RAW: &str = "https://raw.githubusercontent.com/o/r/main";

fn file_entry(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap();
    json!({
        "name": name,
        "path": path,
        "type": "file",
        "download_url": format!("{}/{}", RAW, path),
        "url": format!("{}/repos/o/r/contents/{}", API, path),
    })
}

fn dir_entry(path: &str) -> Value {
    json!({
        "name": path,
        "path": path,
        "type": "dir",
        "download_url": null,
        "url": format!("{}/repos/o/r/contents/{}", API, path),
    })
}

/// Repository `o/r` holding `a.py`, `img.png` and `sub/b.md`.
fn with_repository(client: MemoryClient) -> MemoryClient {
    client
        .with_json(
            &format!("{}/repos/o/r/contents", API),
            &json!([file_entry("a.py"), file_entry("img.png"), dir_entry("sub")]),
        )
        .with_json(
            &format!("{}/repos/o/r/contents/sub", API),
            &json!([file_entry("sub/b.md")]),
        )
        .with_text(&format!("{}/a.py", RAW), "print('a')")
        .with_bytes(&format!("{}/img.png", RAW), vec![0x89, 0x50, 0x4e, 0x47])
        .with_text(&format!("{}/sub/b.md", RAW), "# B\n\nx < y && y > z")
}

fn assert_well_formed(doc: &str) {
    if let Err(e) = check_well_formed(doc) {
        panic!("document is not well-formed ({}):\n{}", e, doc);
    }
}

fn position_of(doc: &str, needle: &str) -> usize {
    doc.find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in:\n{}", needle, doc))
}

#[test]
fn repository_walk_keeps_allowed_files_in_preorder() {
    let client = with_repository(MemoryClient::new());

    let files = RepositoryWalker::new(&client, WalkLimits::default())
        .walk(&format!("{}/repos/o/r/contents", API))
        .unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.py", "sub/b.md"]);
    assert!(!client
        .requests()
        .contains(&format!("{}/img.png", RAW)));
}

#[test]
fn repository_document_escapes_file_content() {
    let client = with_repository(MemoryClient::new());

    let doc = process_repository(&client, API, WalkLimits::default(), "https://github.com/o/r").unwrap();
    assert!(doc.starts_with("<source type=\"github_repository\" url=\"https://github.com/o/r\">"));
    assert!(doc.contains("<file name=\"sub/b.md\">\n# B\n\nx &lt; y &amp;&amp; y &gt; z\n</file>"));
    assert!(!doc.contains("img.png"));
    assert_well_formed(&doc);
    assert!(normalize(&doc).is_structured());
}

#[test]
fn pull_request_interleaves_review_comments_with_diff() {
    let pr_api = format!("{}/repos/o/r/pulls/7", API);
    let diff_url = "https://github.com/o/r/pull/7.diff";
    let comments_url = format!("{}/repos/o/r/issues/7/comments", API);
    let review_url = format!("{}/repos/o/r/pulls/7/comments", API);

    let client = with_repository(MemoryClient::new())
        .with_json(
            &pr_api,
            &json!({
                "title": "Fix <parser>",
                "body": "Handles & escapes",
                "user": {"login": "alice"},
                "commits": 3,
                "base": {"ref": "main", "label": "o:main"},
                "head": {"ref": "fix", "label": "alice:fix"},
                "diff_url": diff_url,
                "comments_url": comments_url,
                "review_comments_url": review_url,
            }),
        )
        .with_text(diff_url, "diff --git a/a.py b/a.py\n@@ -1 +1 @@\n-old\n+new\n context")
        .with_json(
            &comments_url,
            &json!([{"user": {"login": "carol"}, "body": "Looks good overall"}]),
        )
        .with_json(
            &review_url,
            &json!([
                {"user": {"login": "bob"}, "body": "at four", "position": 4, "path": "a.py", "original_line": 1},
                {"user": {"login": "dave"}, "body": "at one", "position": 1, "path": "a.py", "original_line": 1},
            ]),
        );

    let doc = process_pull_request(&client, API, WalkLimits::default(), "https://github.com/o/r/pull/7").unwrap();
    assert_well_formed(&doc);

    assert!(doc.contains("<title>Fix &lt;parser&gt;</title>"));
    assert!(doc.contains("<description>Handles &amp; escapes</description>"));
    assert!(doc.contains("alice wants to merge 3 commits into o:main from alice:fix"));

    let line1 = position_of(&doc, "\n@@ -1 +1 @@\n");
    let at_one = position_of(&doc, "<content>at one</content>");
    let line2 = position_of(&doc, "\n-old\n");
    let line4 = position_of(&doc, "\n context\n");
    let at_four = position_of(&doc, "<content>at four</content>");
    let general = position_of(&doc, "<content>Looks good overall</content>");
    assert!(line1 < at_one && at_one < line2, "position 1 follows line 1");
    assert!(line4 < at_four, "position 4 follows line 4");
    assert!(at_four < general, "unpositioned comments come last");

    let repository = position_of(&doc, "<repository>\n<source type=\"github_repository\"");
    assert!(general < repository);
    assert!(doc.contains("<file name=\"a.py\">"));
}

#[test]
fn issue_resolves_code_snippets() {
    let issue_api = format!("{}/repos/o/r/issues/3", API);
    let comments_url = format!("{}/repos/o/r/issues/3/comments", API);
    let source: String = (1..=20).map(|i| format!("line {}\n", i)).collect();

    let client = with_repository(MemoryClient::new())
        .with_json(
            &issue_api,
            &json!({"title": "Crash", "body": null, "comments_url": comments_url}),
        )
        .with_json(
            &comments_url,
            &json!([
                {"user": {"login": "erin"}, "body": "Here: https://github.com/o/r/blob/main/f.py#L10-L12"},
                {"user": {"login": "frank"}, "body": "Gone: https://github.com/o/r/blob/main/missing.py#L1-L2"},
            ]),
        )
        .with_text("https://github.com/o/r/raw/main/f.py", &source);

    let doc = process_issue(&client, API, WalkLimits::default(), "https://github.com/o/r/issues/3").unwrap();
    assert_well_formed(&doc);

    assert!(doc.contains("<title>Crash</title>\n<description></description>"));
    assert!(doc.contains("<code_snippet>\n<![CDATA[line 10\nline 11\nline 12]]>\n</code_snippet>"));
    assert_eq!(doc.matches("<code_snippet>").count(), 1);
    assert!(doc.contains("<author>frank</author>"));
    assert!(doc.contains("<repository>"));
}

#[test]
fn paginated_comments_are_all_collected() {
    let issue_api = format!("{}/repos/o/r/issues/4", API);
    let page1 = format!("{}/repos/o/r/issues/4/comments", API);
    let page2 = format!("{}/repos/o/r/issues/4/comments?page=2", API);

    let client = with_repository(MemoryClient::new())
        .with_json(
            &issue_api,
            &json!({"title": "Paged", "body": "b", "comments_url": page1}),
        )
        .with_json_page(&page1, &json!([{"user": {"login": "p1"}, "body": "first"}]), &page2)
        .with_json(&page2, &json!([{"user": {"login": "p2"}, "body": "second"}]));

    let doc = process_issue(&client, API, WalkLimits::default(), "https://github.com/o/r/issues/4").unwrap();
    assert!(position_of(&doc, "<author>p1</author>") < position_of(&doc, "<author>p2</author>"));
}

#[test]
fn missing_pull_request_is_fatal() {
    let client = MemoryClient::new();
    let err = process_pull_request(&client, API, WalkLimits::default(), "https://github.com/o/r/pull/404")
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
}

#[test]
fn arxiv_failure_is_fatal() {
    let client = MemoryClient::new();
    assert!(process_arxiv(&client, "https://arxiv.org/abs/2401.00001").is_err());
}

#[test]
fn recoverable_failures_yield_well_formed_error_documents() {
    let client = MemoryClient::new().with_text(
        "https://www.youtube.com/api/timedtext?lang=en&v=dQw4w9WgXcQ",
        "<transcript></transcript>",
    );

    let paper = process_scihub(&client, "https://sci-hub.se", "10.1000/<weird>&id");
    assert!(paper.contains("<error>"));
    assert_well_formed(&paper);

    let transcript = process_transcript(
        &client,
        "https://www.youtube.com/api/timedtext",
        "en",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    );
    assert!(transcript.contains("<error>No transcript available for video dQw4w9WgXcQ</error>"));
    assert_well_formed(&transcript);

    let no_id = process_transcript(
        &client,
        "https://www.youtube.com/api/timedtext",
        "en",
        "https://www.youtube.com/feed/library",
    );
    assert!(no_id.contains("<error>Could not extract video ID from URL.</error>"));
    assert_well_formed(&no_id);
}
